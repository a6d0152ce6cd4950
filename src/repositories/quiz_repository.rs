use async_trait::async_trait;
use futures::TryStreamExt;
use chrono::Utc;
use mongodb::{
    bson::{doc, to_bson, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{Answer, Question, Quiz},
    repositories::is_duplicate_key,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn find_by_lesson_id(&self, lesson_id: &str) -> AppResult<Option<Quiz>>;
    async fn find_by_lesson_ids(&self, lesson_ids: &[String]) -> AppResult<Vec<Quiz>>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>>;
    /// Fails with `AlreadyExists` when the lesson already has a quiz.
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    /// The edits below are single-document atomic updates returning the quiz
    /// as stored afterwards, or `None` when the quiz (or question) is gone.
    async fn push_question(&self, quiz_id: &str, question: Question) -> AppResult<Option<Quiz>>;
    async fn set_answers(
        &self,
        quiz_id: &str,
        question_id: &str,
        answers: Vec<Answer>,
    ) -> AppResult<Option<Quiz>>;
    async fn remove_question(&self, quiz_id: &str, question_id: &str)
        -> AppResult<Option<Quiz>>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quizzes");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let lesson_index = IndexModel::builder()
            .keys(doc! { "lesson_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("lesson_id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(lesson_index).await?;

        log::info!("Successfully created indexes for quizzes collection");
        Ok(())
    }

    async fn edit(&self, filter: Document, mut update: Document) -> AppResult<Option<Quiz>> {
        let set = touch(update.get_document("$set").ok().cloned())?;
        update.insert("$set", set);

        let quiz = self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?;
        Ok(quiz)
    }
}

fn touch(set: Option<Document>) -> AppResult<Document> {
    let mut set = set.unwrap_or_default();
    set.insert("modified_at", to_bson(&Utc::now())?);
    Ok(set)
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn find_by_lesson_id(&self, lesson_id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self
            .collection
            .find_one(doc! { "lesson_id": lesson_id })
            .await?;
        Ok(quiz)
    }

    async fn find_by_lesson_ids(&self, lesson_ids: &[String]) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "lesson_id": { "$in": lesson_ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Quiz>> {
        let quizzes = self
            .collection
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(quizzes)
    }

    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        match self.collection.insert_one(&quiz).await {
            Ok(_) => Ok(quiz),
            Err(err) if is_duplicate_key(&err) => Err(AppError::AlreadyExists(format!(
                "Lesson '{}' already has a quiz",
                quiz.lesson_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn push_question(&self, quiz_id: &str, question: Question) -> AppResult<Option<Quiz>> {
        self.edit(
            doc! { "id": quiz_id },
            doc! { "$push": { "questions": to_bson(&question)? } },
        )
        .await
    }

    async fn set_answers(
        &self,
        quiz_id: &str,
        question_id: &str,
        answers: Vec<Answer>,
    ) -> AppResult<Option<Quiz>> {
        self.edit(
            doc! { "id": quiz_id, "questions.id": question_id },
            doc! { "$set": { "questions.$.answers": to_bson(&answers)? } },
        )
        .await
    }

    async fn remove_question(
        &self,
        quiz_id: &str,
        question_id: &str,
    ) -> AppResult<Option<Quiz>> {
        self.edit(
            doc! { "id": quiz_id, "questions.id": question_id },
            doc! { "$pull": { "questions": { "id": question_id } } },
        )
        .await
    }
}
