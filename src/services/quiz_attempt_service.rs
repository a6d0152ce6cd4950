use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizAttempt},
    repositories::QuizAttemptRepository,
};

/// Outcome of grading one submission against a quiz.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: f64,
    pub incorrect_question_ids: Vec<String>,
}

/// Scores `selections` (question id → answer id) against the quiz. A question
/// counts only when the selected answer is its first answer flagged correct.
pub fn grade(quiz: &Quiz, selections: &HashMap<String, String>) -> Grade {
    let total = quiz.questions.len();
    let mut incorrect_question_ids = Vec::new();

    for question in &quiz.questions {
        let answered_correctly = match (question.correct_answer(), selections.get(&question.id)) {
            (Some(correct), Some(selected)) => &correct.id == selected,
            _ => false,
        };
        if !answered_correctly {
            incorrect_question_ids.push(question.id.clone());
        }
    }

    let score = if total == 0 {
        0.0
    } else {
        let correct = total - incorrect_question_ids.len();
        round2(correct as f64 / total as f64 * 100.0)
    };

    Grade {
        score,
        incorrect_question_ids,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The attempt ledger. Callers are expected to have passed the retake gate.
pub struct QuizAttemptService {
    repository: Arc<dyn QuizAttemptRepository>,
}

impl QuizAttemptService {
    pub fn new(repository: Arc<dyn QuizAttemptRepository>) -> Self {
        Self { repository }
    }

    /// Records a first attempt for the pair.
    pub async fn submit(
        &self,
        student_id: &str,
        quiz: &Quiz,
        selections: &HashMap<String, String>,
    ) -> AppResult<QuizAttempt> {
        let grade = grade(quiz, selections);
        let attempt = QuizAttempt::new(
            student_id,
            &quiz.id,
            grade.score,
            grade.incorrect_question_ids,
        );

        match self.repository.create_first(attempt).await {
            Ok(attempt) => {
                log::info!(
                    "Student {} scored {} on quiz {}",
                    student_id,
                    attempt.score,
                    quiz.id
                );
                Ok(attempt)
            }
            Err(AppError::AlreadyExists(_)) => {
                log::warn!(
                    "Student {} lost a first-attempt race on quiz {}",
                    student_id,
                    quiz.id
                );
                Err(AppError::InvalidState(
                    "Quiz already attempted; request a retake to try again".to_string(),
                ))
            }
            Err(err) => Err(err),
        }
    }

    /// Grades a submission backed by an approved retake and swaps it in for
    /// the previous attempt, spending the grant.
    pub async fn submit_with_grant(
        &self,
        student_id: &str,
        quiz: &Quiz,
        retake_request_id: &str,
        selections: &HashMap<String, String>,
    ) -> AppResult<QuizAttempt> {
        let grade = grade(quiz, selections);
        let attempt = QuizAttempt::new(
            student_id,
            &quiz.id,
            grade.score,
            grade.incorrect_question_ids,
        );

        let attempt = self
            .repository
            .replace_with_grant(retake_request_id, attempt)
            .await?;

        log::info!(
            "Student {} retook quiz {} and scored {}; retake {} consumed",
            student_id,
            quiz.id,
            attempt.score,
            retake_request_id
        );
        Ok(attempt)
    }

    pub async fn latest_attempt(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        self.repository.find_latest(student_id, quiz_id).await
    }
}
