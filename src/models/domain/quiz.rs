use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quiz attached to exactly one lesson. Questions are embedded and keep
/// their insertion order.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, SimpleObject)]
pub struct Answer {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl Quiz {
    pub fn new(lesson_id: &str, title: &str) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            lesson_id: lesson_id.to_string(),
            title: title.to_string(),
            questions: Vec::new(),
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

impl Question {
    pub fn new(text: &str, answers: Vec<Answer>) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            answers,
        }
    }

    /// The first answer flagged correct, in storage order. Further answers
    /// flagged correct are never used for grading.
    pub fn correct_answer(&self) -> Option<&Answer> {
        self.answers.iter().find(|a| a.is_correct)
    }
}

impl Answer {
    pub fn new(text: &str, is_correct: bool) -> Self {
        Answer {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_correct,
        }
    }
}
