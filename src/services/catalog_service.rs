use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{require_student, require_teacher, Identity},
    errors::{AppError, AppResult},
    models::{
        domain::{Course, Lesson, Quiz},
        dto::{
            request::{CreateCourseInput, CreateLessonInput},
            response::{CourseDetail, CourseDto, LessonDetail, LessonDto},
        },
    },
    repositories::{CourseRepository, LessonRepository, QuizRepository, RetakeRequestRepository},
};

/// A quiz together with the lesson and course it hangs off. Every access
/// check on the take/approve paths is answered from this chain.
#[derive(Debug, Clone)]
pub struct QuizScope {
    pub quiz: Quiz,
    pub lesson: Lesson,
    pub course: Course,
}

pub struct CatalogService {
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    quizzes: Arc<dyn QuizRepository>,
    retake_requests: Arc<dyn RetakeRequestRepository>,
}

impl CatalogService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        quizzes: Arc<dyn QuizRepository>,
        retake_requests: Arc<dyn RetakeRequestRepository>,
    ) -> Self {
        Self {
            courses,
            lessons,
            quizzes,
            retake_requests,
        }
    }

    pub async fn get_course(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course with id '{}' not found", course_id)))
    }

    pub async fn get_lesson(&self, lesson_id: &str) -> AppResult<Lesson> {
        self.lessons
            .find_by_id(lesson_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lesson with id '{}' not found", lesson_id)))
    }

    /// Resolves quiz → lesson → course.
    pub async fn quiz_scope(&self, quiz_id: &str) -> AppResult<QuizScope> {
        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))?;
        let lesson = self.get_lesson(&quiz.lesson_id).await?;
        let course = self.get_course(&lesson.course_id).await?;

        Ok(QuizScope {
            quiz,
            lesson,
            course,
        })
    }

    /// Loads a course the caller must own.
    pub async fn owned_course(&self, identity: &Identity, course_id: &str) -> AppResult<Course> {
        require_teacher(identity)?;
        let course = self.get_course(course_id).await?;
        require_owner(identity, &course)?;
        Ok(course)
    }

    pub async fn create_course(
        &self,
        identity: &Identity,
        input: CreateCourseInput,
    ) -> AppResult<CourseDto> {
        require_teacher(identity)?;
        input.validate()?;

        let course = Course::new(input.title.trim(), input.description, &identity.id);
        let course = self.courses.create(course).await?;

        log::info!("Teacher {} created course {}", identity.id, course.id);
        Ok(course.into())
    }

    pub async fn add_lesson(
        &self,
        identity: &Identity,
        input: CreateLessonInput,
    ) -> AppResult<LessonDto> {
        input.validate()?;
        let course = self.owned_course(identity, &input.course_id).await?;

        let lesson = Lesson::new(&course.id, input.title.trim(), &input.content, input.order);
        let lesson = self.lessons.create(lesson).await?;

        log::info!("Lesson {} added to course {}", lesson.id, course.id);
        Ok(lesson.into())
    }

    pub async fn enroll(&self, identity: &Identity, course_id: &str) -> AppResult<CourseDto> {
        require_student(identity)?;
        let course = self.courses.add_student(course_id, &identity.id).await?;

        log::info!("Student {} enrolled in course {}", identity.id, course.id);
        Ok(course.into())
    }

    pub async fn available_courses(&self, identity: &Identity) -> AppResult<Vec<CourseDto>> {
        require_student(identity)?;
        let courses = self.courses.find_not_enrolled(&identity.id).await?;
        Ok(courses.into_iter().map(CourseDto::from).collect())
    }

    /// Owned courses for a teacher, enrolled courses for a student.
    pub async fn my_courses(&self, identity: &Identity) -> AppResult<Vec<CourseDto>> {
        let courses = if identity.role.can_manage_courses() {
            self.courses.find_by_teacher(&identity.id).await?
        } else {
            self.courses.find_by_student(&identity.id).await?
        };
        Ok(courses.into_iter().map(CourseDto::from).collect())
    }

    pub async fn course_detail(
        &self,
        identity: &Identity,
        course_id: &str,
    ) -> AppResult<CourseDetail> {
        let course = self.get_course(course_id).await?;
        require_course_access(identity, &course)?;

        let lessons = self.lessons.find_by_course(&course.id).await?;

        Ok(CourseDetail {
            course: course.into(),
            lessons: lessons.into_iter().map(LessonDto::from).collect(),
        })
    }

    pub async fn lesson_detail(
        &self,
        identity: &Identity,
        lesson_id: &str,
    ) -> AppResult<LessonDetail> {
        let lesson = self.get_lesson(lesson_id).await?;
        let course = self.get_course(&lesson.course_id).await?;
        require_course_access(identity, &course)?;

        let quiz = self.quizzes.find_by_lesson_id(&lesson.id).await?;

        let request_already_sent = match (&quiz, identity.role.can_take_quizzes()) {
            (Some(quiz), true) => self
                .retake_requests
                .find_by_student_and_quiz(&identity.id, &quiz.id)
                .await?
                .is_some_and(|request| !request.approved),
            _ => false,
        };

        Ok(LessonDetail {
            course: course.into(),
            lesson: lesson.into(),
            quiz_id: quiz.map(|q| q.id),
            request_already_sent,
        })
    }
}

pub fn require_owner(identity: &Identity, course: &Course) -> AppResult<()> {
    if !course.is_owned_by(&identity.id) {
        log::warn!(
            "User {} refused: course {} belongs to another teacher",
            identity.id,
            course.id
        );
        return Err(AppError::PermissionDenied(
            "Only the course teacher can do this".to_string(),
        ));
    }
    Ok(())
}

/// Students must be enrolled; teachers are always refused.
pub fn require_enrolled_student(identity: &Identity, course: &Course) -> AppResult<()> {
    require_student(identity)?;
    if !course.is_enrolled(&identity.id) {
        log::warn!(
            "Student {} refused: not enrolled in course {}",
            identity.id,
            course.id
        );
        return Err(AppError::PermissionDenied(
            "You are not enrolled in this course".to_string(),
        ));
    }
    Ok(())
}

fn require_course_access(identity: &Identity, course: &Course) -> AppResult<()> {
    if identity.role.can_manage_courses() {
        require_owner(identity, course)
    } else {
        require_enrolled_student(identity, course)
    }
}
