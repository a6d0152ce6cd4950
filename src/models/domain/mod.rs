pub mod course;
pub mod quiz;
pub mod quiz_attempt;
pub mod retake_request;
pub mod user;
pub use course::{Course, Lesson};
pub use quiz::{Answer, Question, Quiz};
pub use quiz_attempt::QuizAttempt;
pub use retake_request::{RetakeRequest, RetakeState};
pub use user::{User, UserRole};
