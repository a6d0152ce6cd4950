use std::{collections::HashSet, sync::Arc};

use validator::Validate;

use crate::{
    auth::Identity,
    errors::{AppError, AppResult},
    models::{
        domain::{Answer, Question, Quiz},
        dto::request::{AddQuestionInput, AnswerInput, CreateQuizInput, SetAnswersInput},
    },
    repositories::QuizRepository,
    services::catalog_service::{require_owner, CatalogService},
};

pub struct QuizService {
    repository: Arc<dyn QuizRepository>,
    catalog: Arc<CatalogService>,
}

impl QuizService {
    pub fn new(repository: Arc<dyn QuizRepository>, catalog: Arc<CatalogService>) -> Self {
        Self {
            repository,
            catalog,
        }
    }

    /// Full quiz, correctness flags included. Owning teacher only.
    pub async fn get_quiz(&self, identity: &Identity, quiz_id: &str) -> AppResult<Quiz> {
        let scope = self.catalog.quiz_scope(quiz_id).await?;
        require_owner(identity, &scope.course)?;
        Ok(scope.quiz)
    }

    pub async fn quiz_for_lesson(&self, lesson_id: &str) -> AppResult<Option<Quiz>> {
        self.repository.find_by_lesson_id(lesson_id).await
    }

    pub async fn create_quiz(&self, identity: &Identity, input: CreateQuizInput) -> AppResult<Quiz> {
        input.validate()?;

        let lesson = self.catalog.get_lesson(&input.lesson_id).await?;
        self.catalog.owned_course(identity, &lesson.course_id).await?;

        let quiz = self
            .repository
            .create(Quiz::new(&lesson.id, input.title.trim()))
            .await?;

        log::info!("Quiz {} created for lesson {}", quiz.id, lesson.id);
        Ok(quiz)
    }

    pub async fn add_question(
        &self,
        identity: &Identity,
        input: AddQuestionInput,
    ) -> AppResult<Quiz> {
        input.validate()?;
        let quiz = self.get_quiz(identity, &input.quiz_id).await?;

        let answers: Vec<Answer> = input.answers.into_iter().map(Answer::from).collect();
        warn_if_uncorrectable(&quiz.id, &answers);

        self.repository
            .push_question(&quiz.id, Question::new(input.text.trim(), answers))
            .await?
            .ok_or_else(|| quiz_not_found(&quiz.id))
    }

    /// Replaces every answer of one question. Answers sent with the id of a
    /// stored answer keep that id, so selections made before the edit still
    /// grade against them.
    pub async fn set_answers(&self, identity: &Identity, input: SetAnswersInput) -> AppResult<Quiz> {
        input.validate()?;
        let quiz = self.get_quiz(identity, &input.quiz_id).await?;

        let question = quiz
            .question(&input.question_id)
            .ok_or_else(|| question_not_found(&quiz.id, &input.question_id))?;

        let answers = merge_answers(&question.answers, input.answers);
        warn_if_uncorrectable(&quiz.id, &answers);

        self.repository
            .set_answers(&quiz.id, &question.id, answers)
            .await?
            .ok_or_else(|| question_not_found(&quiz.id, &input.question_id))
    }

    pub async fn remove_question(
        &self,
        identity: &Identity,
        quiz_id: &str,
        question_id: &str,
    ) -> AppResult<Quiz> {
        let quiz = self.get_quiz(identity, quiz_id).await?;

        self.repository
            .remove_question(&quiz.id, question_id)
            .await?
            .ok_or_else(|| question_not_found(&quiz.id, question_id))
    }
}

/// Builds the new answer list, reusing the id of a stored answer when the
/// input names one. Unknown or repeated ids get a fresh answer.
fn merge_answers(existing: &[Answer], inputs: Vec<AnswerInput>) -> Vec<Answer> {
    let mut used = HashSet::new();

    inputs
        .into_iter()
        .map(|input| {
            let kept = input
                .id
                .as_deref()
                .filter(|id| existing.iter().any(|a| a.id == *id))
                .filter(|id| used.insert(id.to_string()))
                .map(str::to_string);

            match kept {
                Some(id) => Answer {
                    id,
                    text: input.text,
                    is_correct: input.is_correct,
                },
                None => Answer::from(input),
            }
        })
        .collect()
}

fn quiz_not_found(quiz_id: &str) -> AppError {
    AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id))
}

fn question_not_found(quiz_id: &str, question_id: &str) -> AppError {
    AppError::NotFound(format!(
        "Question with id '{}' not found in quiz '{}'",
        question_id, quiz_id
    ))
}

fn warn_if_uncorrectable(quiz_id: &str, answers: &[Answer]) {
    if !answers.iter().any(|a| a.is_correct) {
        log::warn!(
            "Quiz {} has a question with no correct answer; it can never be answered correctly",
            quiz_id
        );
    }
}
