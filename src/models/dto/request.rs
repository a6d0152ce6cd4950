use std::collections::HashMap;

use async_graphql::InputObject;
use serde::Deserialize;
use validator::Validate;

use crate::models::domain::{Answer, UserRole};

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateCourseInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateLessonInput {
    pub course_id: String,

    #[validate(length(min = 1, max = 255))]
    pub title: String,

    #[validate(length(max = 50000))]
    pub content: String,

    #[validate(range(min = 0))]
    pub order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct CreateQuizInput {
    pub lesson_id: String,

    #[validate(length(min = 1, max = 255))]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct AnswerInput {
    /// Id of the stored answer being edited. Omit for a new answer.
    #[graphql(default)]
    #[serde(default)]
    pub id: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub text: String,

    pub is_correct: bool,
}

impl From<AnswerInput> for Answer {
    fn from(input: AnswerInput) -> Self {
        Answer::new(&input.text, input.is_correct)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct AddQuestionInput {
    pub quiz_id: String,

    #[validate(length(min = 1, max = 5000))]
    pub text: String,

    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
pub struct SetAnswersInput {
    pub quiz_id: String,
    pub question_id: String,

    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

#[derive(Debug, Clone, Deserialize, InputObject)]
pub struct SelectedAnswerInput {
    pub question_id: String,
    pub answer_id: String,
}

#[derive(Debug, Clone, Deserialize, InputObject)]
pub struct SubmitQuizAttemptInput {
    pub quiz_id: String,
    #[graphql(default)]
    #[serde(default)]
    pub answers: Vec<SelectedAnswerInput>,
}

impl SubmitQuizAttemptInput {
    /// Question id to selected answer id. A repeated question keeps the last
    /// selection.
    pub fn selections(&self) -> HashMap<String, String> {
        self.answers
            .iter()
            .map(|a| (a.question_id.clone(), a.answer_id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_valid_register_request() {
        let request = RegisterRequest {
            username: "olena".to_string(),
            password: "correct-horse".to_string(),
            role: UserRole::Teacher,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_password_too_short() {
        let request = RegisterRequest {
            username: "olena".to_string(),
            password: "short".to_string(),
            role: UserRole::Student,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_username_too_short() {
        let request = RegisterRequest {
            username: "ab".to_string(),
            password: "long-enough-password".to_string(),
            role: UserRole::Student,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_nested_answer_validation() {
        let input = AddQuestionInput {
            quiz_id: "quiz-1".to_string(),
            text: "Capital of France?".to_string(),
            answers: vec![AnswerInput {
                id: None,
                text: String::new(),
                is_correct: true,
            }],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_selections_keep_last_answer_per_question() {
        let input = SubmitQuizAttemptInput {
            quiz_id: "quiz-1".to_string(),
            answers: vec![
                SelectedAnswerInput {
                    question_id: "q1".to_string(),
                    answer_id: "a1".to_string(),
                },
                SelectedAnswerInput {
                    question_id: "q1".to_string(),
                    answer_id: "a2".to_string(),
                },
            ],
        };

        let selections = input.selections();
        assert_eq!(selections.len(), 1);
        assert_eq!(selections.get("q1").map(String::as_str), Some("a2"));
    }
}
