use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR},
    options::IndexOptions,
    ClientSession, Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{QuizAttempt, RetakeRequest},
    repositories::is_duplicate_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Records a first attempt. Fails with `AlreadyExists` when the student
    /// already holds an attempt for the quiz.
    async fn create_first(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_latest(&self, student_id: &str, quiz_id: &str)
        -> AppResult<Option<QuizAttempt>>;
    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<QuizAttempt>>;
    async fn find_by_quizzes(&self, quiz_ids: &[String]) -> AppResult<Vec<QuizAttempt>>;
    /// Consumes the approved retake request and swaps the student's attempts
    /// for `attempt` as one unit. Fails with `InvalidState` when the grant is
    /// gone, so a grant can back at most one submission.
    async fn replace_with_grant(
        &self,
        retake_request_id: &str,
        attempt: QuizAttempt,
    ) -> AppResult<QuizAttempt>;
}

pub struct MongoQuizAttemptRepository {
    db: Database,
    collection: Collection<QuizAttempt>,
    retake_requests: Collection<RetakeRequest>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            db: db.clone(),
            collection: db.get_collection("quiz_attempts"),
            retake_requests: db.get_collection("retake_requests"),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let student_quiz_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("student_quiz_unique".to_string())
                    .build(),
            )
            .build();

        let quiz_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1 })
            .options(IndexOptions::builder().name("quiz_id".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(student_quiz_index).await?;
        self.collection.create_index(quiz_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }

    async fn consume_grant(
        &self,
        session: &mut ClientSession,
        retake_request_id: &str,
        attempt: &QuizAttempt,
    ) -> Result<bool, MongoError> {
        let deleted = self
            .retake_requests
            .delete_one(doc! {
                "id": retake_request_id,
                "student_id": &attempt.student_id,
                "quiz_id": &attempt.quiz_id,
                "approved": true,
            })
            .session(&mut *session)
            .await?;

        if deleted.deleted_count == 0 {
            return Ok(false);
        }

        self.collection
            .delete_many(doc! {
                "student_id": &attempt.student_id,
                "quiz_id": &attempt.quiz_id,
            })
            .session(&mut *session)
            .await?;

        self.collection
            .insert_one(attempt)
            .session(&mut *session)
            .await?;

        Ok(true)
    }
}

fn grant_consumed() -> AppError {
    AppError::InvalidState("Retake is no longer approved for this quiz".to_string())
}

fn transaction_error(err: MongoError) -> AppError {
    if err.contains_label(TRANSIENT_TRANSACTION_ERROR) {
        grant_consumed()
    } else {
        err.into()
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create_first(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Student '{}' already attempted quiz '{}'",
                attempt.student_id, attempt.quiz_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_latest(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "student_id": student_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "completed_at": -1 })
            .await?;
        Ok(attempt)
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "student_id": student_id })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn find_by_quizzes(&self, quiz_ids: &[String]) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "quiz_id": { "$in": quiz_ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn replace_with_grant(
        &self,
        retake_request_id: &str,
        attempt: QuizAttempt,
    ) -> AppResult<QuizAttempt> {
        let mut session = self.db.start_session().await?;
        session.start_transaction().await?;

        match self
            .consume_grant(&mut session, retake_request_id, &attempt)
            .await
        {
            Ok(true) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(transaction_error)?;
                Ok(attempt)
            }
            Ok(false) => {
                session.abort_transaction().await?;
                Err(grant_consumed())
            }
            Err(err) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    log::warn!("Failed to abort retake transaction: {}", abort_err);
                }
                Err(transaction_error(err))
            }
        }
    }
}
