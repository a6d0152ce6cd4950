use async_graphql::Enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::QuizAttempt;

/// A student's ask to redo a quiz. Unique per (student, quiz); an approved
/// request is a grant that a single submission consumes.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetakeRequest {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub approved: bool,
}

impl RetakeRequest {
    pub fn new(student_id: &str, quiz_id: &str) -> Self {
        RetakeRequest {
            id: Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            quiz_id: quiz_id.to_string(),
            requested_at: Utc::now(),
            approved: false,
        }
    }
}

/// Where a (student, quiz) pair stands. Never stored; always derived from the
/// presence of an attempt and a retake request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Enum)]
pub enum RetakeState {
    NeverAttempted,
    AttemptedNoRequest,
    AttemptedPending,
    AttemptedApproved,
}

impl RetakeState {
    pub fn derive(attempt: Option<&QuizAttempt>, request: Option<&RetakeRequest>) -> Self {
        match (attempt, request) {
            (None, _) => RetakeState::NeverAttempted,
            (Some(_), None) => RetakeState::AttemptedNoRequest,
            (Some(_), Some(r)) if r.approved => RetakeState::AttemptedApproved,
            (Some(_), Some(_)) => RetakeState::AttemptedPending,
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(
            self,
            RetakeState::NeverAttempted | RetakeState::AttemptedApproved
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt() -> QuizAttempt {
        QuizAttempt::new("student-1", "quiz-1", 50.0, vec![])
    }

    fn request(approved: bool) -> RetakeRequest {
        let mut request = RetakeRequest::new("student-1", "quiz-1");
        request.approved = approved;
        request
    }

    #[test]
    fn derive_covers_every_combination() {
        let a = attempt();
        let pending = request(false);
        let approved = request(true);

        assert_eq!(RetakeState::derive(None, None), RetakeState::NeverAttempted);
        assert_eq!(
            RetakeState::derive(None, Some(&approved)),
            RetakeState::NeverAttempted
        );
        assert_eq!(
            RetakeState::derive(Some(&a), None),
            RetakeState::AttemptedNoRequest
        );
        assert_eq!(
            RetakeState::derive(Some(&a), Some(&pending)),
            RetakeState::AttemptedPending
        );
        assert_eq!(
            RetakeState::derive(Some(&a), Some(&approved)),
            RetakeState::AttemptedApproved
        );
    }

    #[test]
    fn only_fresh_and_approved_pairs_may_submit() {
        assert!(RetakeState::NeverAttempted.can_submit());
        assert!(RetakeState::AttemptedApproved.can_submit());
        assert!(!RetakeState::AttemptedNoRequest.can_submit());
        assert!(!RetakeState::AttemptedPending.can_submit());
    }

    #[test]
    fn new_request_starts_unapproved() {
        let request = RetakeRequest::new("student-1", "quiz-1");
        assert!(!request.approved);
    }
}
