use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::RetakeRequest,
    repositories::is_duplicate_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RetakeRequestRepository: Send + Sync {
    /// Fails with `AlreadyExists` when the pair already has a request.
    async fn create(&self, request: RetakeRequest) -> AppResult<RetakeRequest>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<RetakeRequest>>;
    async fn find_by_student_and_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<RetakeRequest>>;
    /// Flips a pending request to approved. Returns false when the request
    /// was already approved or no longer exists.
    async fn approve(&self, id: &str) -> AppResult<bool>;
    async fn find_by_quizzes(&self, quiz_ids: &[String]) -> AppResult<Vec<RetakeRequest>>;
}

pub struct MongoRetakeRequestRepository {
    collection: Collection<RetakeRequest>,
}

impl MongoRetakeRequestRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("retake_requests");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for retake_requests collection");

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

        self.collection.create_index(id_index).await?;
        self.collection.create_index(student_quiz_index).await?;

        log::info!("Successfully created indexes for retake_requests collection");
        Ok(())
    }
}

#[async_trait]
impl RetakeRequestRepository for MongoRetakeRequestRepository {
    async fn create(&self, request: RetakeRequest) -> AppResult<RetakeRequest> {
        match self.collection.insert_one(&request).await {
            Ok(_) => Ok(request),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Retake already requested for quiz '{}'",
                request.quiz_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<RetakeRequest>> {
        let request = self.collection.find_one(doc! { "id": id }).await?;
        Ok(request)
    }

    async fn find_by_student_and_quiz(
        &self,
        student_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<RetakeRequest>> {
        let request = self
            .collection
            .find_one(doc! {
                "student_id": student_id,
                "quiz_id": quiz_id
            })
            .await?;
        Ok(request)
    }

    async fn approve(&self, id: &str) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "approved": false },
                doc! { "$set": { "approved": true } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn find_by_quizzes(&self, quiz_ids: &[String]) -> AppResult<Vec<RetakeRequest>> {
        let requests = self
            .collection
            .find(doc! { "quiz_id": { "$in": quiz_ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(requests)
    }
}
