use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    Course, Lesson, Quiz, QuizAttempt, RetakeRequest, RetakeState, User, UserRole,
};

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub role: UserRole,
    #[graphql(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

pub type RegisterResponse = ApiResponse<UserDto>;

#[derive(Debug, Serialize, SimpleObject)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserDto,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CourseDto {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub teacher_id: String,
    pub student_count: i64,
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        CourseDto {
            student_count: course.student_ids.len() as i64,
            id: course.id,
            title: course.title,
            description: course.description,
            teacher_id: course.teacher_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct LessonDto {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub content: String,
    pub order: i32,
}

impl From<Lesson> for LessonDto {
    fn from(lesson: Lesson) -> Self {
        LessonDto {
            id: lesson.id,
            course_id: lesson.course_id,
            title: lesson.title,
            content: lesson.content,
            order: lesson.order,
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CourseDetail {
    pub course: CourseDto,
    pub lessons: Vec<LessonDto>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct LessonDetail {
    pub course: CourseDto,
    pub lesson: LessonDto,
    pub quiz_id: Option<String>,
    /// Only ever true for the student viewing their own pending request.
    pub request_already_sent: bool,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizAttemptResponse {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub score: f64,
    pub completed_at: DateTime<Utc>,
    pub incorrect_question_ids: Vec<String>,
}

impl From<QuizAttempt> for QuizAttemptResponse {
    fn from(attempt: QuizAttempt) -> Self {
        QuizAttemptResponse {
            id: attempt.id,
            student_id: attempt.student_id,
            quiz_id: attempt.quiz_id,
            score: attempt.score,
            completed_at: attempt.completed_at,
            incorrect_question_ids: attempt.incorrect_question_ids,
        }
    }
}

/// Quiz as shown to a student: correctness flags stripped.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuizForTaking {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuestionForTaking>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct QuestionForTaking {
    pub id: String,
    pub text: String,
    pub answers: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

impl QuizForTaking {
    pub fn from_quiz(quiz: Quiz) -> Self {
        QuizForTaking {
            id: quiz.id,
            title: quiz.title,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| QuestionForTaking {
                    id: q.id,
                    text: q.text,
                    answers: q
                        .answers
                        .into_iter()
                        .map(|a| AnswerOption {
                            id: a.id,
                            text: a.text,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Either the questions (submission allowed) or the already-done summary.
#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct TakeQuizResponse {
    pub state: RetakeState,
    pub quiz: Option<QuizForTaking>,
    pub latest_score: Option<f64>,
    pub request_already_sent: bool,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct RetakeRequestDto {
    pub id: String,
    pub student_id: String,
    pub quiz_id: String,
    pub requested_at: DateTime<Utc>,
    pub approved: bool,
}

impl From<RetakeRequest> for RetakeRequestDto {
    fn from(request: RetakeRequest) -> Self {
        RetakeRequestDto {
            id: request.id,
            student_id: request.student_id,
            quiz_id: request.quiz_id,
            requested_at: request.requested_at,
            approved: request.approved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Enum)]
pub enum RetakeOutcome {
    Created,
    AlreadyRequested,
    Approved,
    AlreadyApproved,
}

impl RetakeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RetakeOutcome::Created => "Retake request sent to the course teacher",
            RetakeOutcome::AlreadyRequested => "A retake request for this quiz already exists",
            RetakeOutcome::Approved => "Retake approved",
            RetakeOutcome::AlreadyApproved => "Retake was already approved",
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct RetakeRequestResponse {
    pub outcome: RetakeOutcome,
    pub message: String,
    pub request: RetakeRequestDto,
}

impl RetakeRequestResponse {
    pub fn new(outcome: RetakeOutcome, request: RetakeRequest) -> Self {
        RetakeRequestResponse {
            outcome,
            message: outcome.message().to_string(),
            request: request.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct AttemptReportRow {
    pub course_title: String,
    pub lesson_title: String,
    pub quiz_title: String,
    pub score: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct GradebookCell {
    pub lesson_id: String,
    pub quiz_id: String,
    pub score: Option<f64>,
    pub retake_request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct GradebookRow {
    pub student_id: String,
    pub username: String,
    pub cells: Vec<GradebookCell>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct CourseGradebook {
    pub course: CourseDto,
    pub quiz_lessons: Vec<LessonDto>,
    pub rows: Vec<GradebookRow>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct LessonRecommendation {
    pub lesson_id: String,
    pub lesson_title: String,
    pub course_id: String,
    pub course_title: String,
    pub mistakes: i64,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
pub struct StudentDashboard {
    pub completed: i64,
    pub total: i64,
    pub average_score: f64,
    pub recommendations: Vec<LessonRecommendation>,
}
