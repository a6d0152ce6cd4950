use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One scored submission of a quiz by a student. Never updated in place;
/// a consumed retake deletes it and records a fresh one.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub score: f64,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub incorrect_question_ids: Vec<String>,
}

impl QuizAttempt {
    pub fn new(
        student_id: &str,
        quiz_id: &str,
        score: f64,
        incorrect_question_ids: Vec<String>,
    ) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            quiz_id: quiz_id.to_string(),
            score,
            completed_at: Utc::now(),
            incorrect_question_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_attempt_serialization_preserves_grading_fields() {
        let attempt = QuizAttempt::new("student-1", "quiz-1", 66.67, vec!["q-3".to_string()]);

        let json = serde_json::to_string(&attempt).expect("attempt should serialize");
        let parsed: QuizAttempt = serde_json::from_str(&json).expect("attempt should deserialize");

        assert_eq!(parsed.score, 66.67);
        assert_eq!(parsed.incorrect_question_ids, vec!["q-3".to_string()]);
        assert_eq!(parsed.completed_at, attempt.completed_at);
    }
}
