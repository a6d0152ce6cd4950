pub mod course_repository;
pub mod lesson_repository;
pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod retake_request_repository;
pub mod user_repository;

pub use course_repository::{CourseRepository, MongoCourseRepository};
pub use lesson_repository::{LessonRepository, MongoLessonRepository};
pub use quiz_attempt_repository::{MongoQuizAttemptRepository, QuizAttemptRepository};
pub use quiz_repository::{MongoQuizRepository, QuizRepository};
pub use retake_request_repository::{MongoRetakeRequestRepository, RetakeRequestRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

#[cfg(test)]
pub use course_repository::MockCourseRepository;
#[cfg(test)]
pub use lesson_repository::MockLessonRepository;
#[cfg(test)]
pub use quiz_attempt_repository::MockQuizAttemptRepository;
#[cfg(test)]
pub use quiz_repository::MockQuizRepository;
#[cfg(test)]
pub use retake_request_repository::MockRetakeRequestRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// True when a write was rejected by a unique index.
pub(crate) fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
