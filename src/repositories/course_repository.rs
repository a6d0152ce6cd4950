use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::Course,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: Course) -> AppResult<Course>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>>;
    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Course>>;
    async fn find_by_teacher(&self, teacher_id: &str) -> AppResult<Vec<Course>>;
    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<Course>>;
    async fn find_not_enrolled(&self, student_id: &str) -> AppResult<Vec<Course>>;
    /// Adds the student to the course roster; a no-op when already enrolled.
    async fn add_student(&self, course_id: &str, student_id: &str) -> AppResult<Course>;
}

pub struct MongoCourseRepository {
    collection: Collection<Course>,
}

impl MongoCourseRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("courses");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for courses collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let teacher_index = IndexModel::builder()
            .keys(doc! { "teacher_id": 1 })
            .options(IndexOptions::builder().name("teacher_id".to_string()).build())
            .build();

        let student_index = IndexModel::builder()
            .keys(doc! { "student_ids": 1 })
            .options(IndexOptions::builder().name("student_ids".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(teacher_index).await?;
        self.collection.create_index(student_index).await?;

        log::info!("Successfully created indexes for courses collection");
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        self.collection.insert_one(&course).await?;
        Ok(course)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Course>> {
        let course = self.collection.find_one(doc! { "id": id }).await?;
        Ok(course)
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn find_by_teacher(&self, teacher_id: &str) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "teacher_id": teacher_id })
            .sort(doc! { "title": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "student_ids": student_id })
            .sort(doc! { "title": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn find_not_enrolled(&self, student_id: &str) -> AppResult<Vec<Course>> {
        let courses = self
            .collection
            .find(doc! { "student_ids": { "$ne": student_id } })
            .sort(doc! { "title": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(courses)
    }

    async fn add_student(&self, course_id: &str, student_id: &str) -> AppResult<Course> {
        let result = self
            .collection
            .update_one(
                doc! { "id": course_id },
                doc! { "$addToSet": { "student_ids": student_id } },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Course with id '{}' not found",
                course_id
            )));
        }

        self.find_by_id(course_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Course with id '{}' not found", course_id))
        })
    }
}
