use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    auth::{require_student, Identity},
    errors::AppResult,
    models::{
        domain::{Course, Lesson, Quiz, QuizAttempt},
        dto::response::{
            AttemptReportRow, CourseGradebook, GradebookCell, GradebookRow, LessonDto,
            LessonRecommendation, StudentDashboard,
        },
    },
    repositories::{
        CourseRepository, LessonRepository, QuizAttemptRepository, QuizRepository,
        RetakeRequestRepository, UserRepository,
    },
    services::{catalog_service::CatalogService, quiz_attempt_service::round2},
};

const RECOMMENDATION_LIMIT: usize = 5;

/// Read-only views over the attempt ledger for dashboards and exporters.
pub struct ReportService {
    catalog: Arc<CatalogService>,
    courses: Arc<dyn CourseRepository>,
    lessons: Arc<dyn LessonRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    requests: Arc<dyn RetakeRequestRepository>,
    users: Arc<dyn UserRepository>,
}

/// Quizzes, lessons and courses behind a set of attempts, keyed by id.
struct AttemptContext {
    quizzes: HashMap<String, Quiz>,
    lessons: HashMap<String, Lesson>,
    courses: HashMap<String, Course>,
}

impl AttemptContext {
    fn resolve(&self, attempt: &QuizAttempt) -> Option<(&Quiz, &Lesson, &Course)> {
        let quiz = self.quizzes.get(&attempt.quiz_id)?;
        let lesson = self.lessons.get(&quiz.lesson_id)?;
        let course = self.courses.get(&lesson.course_id)?;
        Some((quiz, lesson, course))
    }
}

impl ReportService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<CatalogService>,
        courses: Arc<dyn CourseRepository>,
        lessons: Arc<dyn LessonRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        requests: Arc<dyn RetakeRequestRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            catalog,
            courses,
            lessons,
            quizzes,
            attempts,
            requests,
            users,
        }
    }

    async fn attempt_context(&self, attempts: &[QuizAttempt]) -> AppResult<AttemptContext> {
        let quiz_ids: Vec<String> = unique(attempts.iter().map(|a| a.quiz_id.clone()));
        let quizzes = self.quizzes.find_by_ids(&quiz_ids).await?;

        let lesson_ids = unique(quizzes.iter().map(|q| q.lesson_id.clone()));
        let lessons = self.lessons.find_by_ids(&lesson_ids).await?;

        let course_ids = unique(lessons.iter().map(|l| l.course_id.clone()));
        let courses = self.courses.find_by_ids(&course_ids).await?;

        Ok(AttemptContext {
            quizzes: quizzes.into_iter().map(|q| (q.id.clone(), q)).collect(),
            lessons: lessons.into_iter().map(|l| (l.id.clone(), l)).collect(),
            courses: courses.into_iter().map(|c| (c.id.clone(), c)).collect(),
        })
    }

    /// Every attempt of the student, ordered by course title then completion.
    pub async fn student_report(&self, identity: &Identity) -> AppResult<Vec<AttemptReportRow>> {
        require_student(identity)?;

        let attempts = self.attempts.find_by_student(&identity.id).await?;
        let context = self.attempt_context(&attempts).await?;

        let mut rows: Vec<AttemptReportRow> = attempts
            .iter()
            .filter_map(|attempt| {
                let (quiz, lesson, course) = context.resolve(attempt)?;
                Some(AttemptReportRow {
                    course_title: course.title.clone(),
                    lesson_title: lesson.title.clone(),
                    quiz_title: quiz.title.clone(),
                    score: attempt.score,
                    completed_at: attempt.completed_at,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            a.course_title
                .cmp(&b.course_title)
                .then(a.completed_at.cmp(&b.completed_at))
        });
        Ok(rows)
    }

    /// Latest score and pending retake per enrolled student and quiz lesson.
    pub async fn course_gradebook(
        &self,
        identity: &Identity,
        course_id: &str,
    ) -> AppResult<CourseGradebook> {
        let course = self.catalog.owned_course(identity, course_id).await?;

        let lessons = self.lessons.find_by_course(&course.id).await?;
        let lesson_ids: Vec<String> = lessons.iter().map(|l| l.id.clone()).collect();
        let quizzes = self.quizzes.find_by_lesson_ids(&lesson_ids).await?;
        let quiz_by_lesson: HashMap<&str, &Quiz> =
            quizzes.iter().map(|q| (q.lesson_id.as_str(), q)).collect();

        let quiz_lessons: Vec<(&Lesson, &Quiz)> = lessons
            .iter()
            .filter_map(|l| quiz_by_lesson.get(l.id.as_str()).map(|q| (l, *q)))
            .collect();
        let quiz_ids: Vec<String> = quizzes.iter().map(|q| q.id.clone()).collect();

        let mut latest: HashMap<(String, String), QuizAttempt> = HashMap::new();
        for attempt in self.attempts.find_by_quizzes(&quiz_ids).await? {
            let key = (attempt.student_id.clone(), attempt.quiz_id.clone());
            let newer = latest
                .get(&key)
                .map_or(true, |existing| attempt.completed_at > existing.completed_at);
            if newer {
                latest.insert(key, attempt);
            }
        }

        let pending: HashMap<(String, String), String> = self
            .requests
            .find_by_quizzes(&quiz_ids)
            .await?
            .into_iter()
            .filter(|r| !r.approved)
            .map(|r| ((r.student_id, r.quiz_id), r.id))
            .collect();

        let users: HashMap<String, String> = self
            .users
            .find_by_ids(&course.student_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let rows = course
            .student_ids
            .iter()
            .map(|student_id| GradebookRow {
                student_id: student_id.clone(),
                username: users.get(student_id).cloned().unwrap_or_default(),
                cells: quiz_lessons
                    .iter()
                    .map(|(lesson, quiz)| {
                        let key = (student_id.clone(), quiz.id.clone());
                        GradebookCell {
                            lesson_id: lesson.id.clone(),
                            quiz_id: quiz.id.clone(),
                            score: latest.get(&key).map(|a| a.score),
                            retake_request_id: pending.get(&key).cloned(),
                        }
                    })
                    .collect(),
            })
            .collect();

        Ok(CourseGradebook {
            quiz_lessons: quiz_lessons
                .iter()
                .map(|(lesson, _)| LessonDto::from((*lesson).clone()))
                .collect(),
            course: course.into(),
            rows,
        })
    }

    pub async fn student_dashboard(&self, identity: &Identity) -> AppResult<StudentDashboard> {
        require_student(identity)?;

        let courses = self.courses.find_by_student(&identity.id).await?;
        let mut lesson_ids = Vec::new();
        for course in &courses {
            let lessons = self.lessons.find_by_course(&course.id).await?;
            lesson_ids.extend(lessons.into_iter().map(|l| l.id));
        }
        let total = if lesson_ids.is_empty() {
            0
        } else {
            self.quizzes.find_by_lesson_ids(&lesson_ids).await?.len()
        };

        let attempts = self.attempts.find_by_student(&identity.id).await?;
        let average_score = if attempts.is_empty() {
            0.0
        } else {
            round2(attempts.iter().map(|a| a.score).sum::<f64>() / attempts.len() as f64)
        };

        let context = self.attempt_context(&attempts).await?;
        let mut by_lesson: HashMap<String, LessonRecommendation> = HashMap::new();
        for attempt in &attempts {
            let Some((quiz, lesson, course)) = context.resolve(attempt) else {
                continue;
            };
            for question_id in &attempt.incorrect_question_ids {
                // Questions removed since the attempt no longer count.
                let Some(question) = quiz.question(question_id) else {
                    continue;
                };
                let entry = by_lesson
                    .entry(lesson.id.clone())
                    .or_insert_with(|| LessonRecommendation {
                        lesson_id: lesson.id.clone(),
                        lesson_title: lesson.title.clone(),
                        course_id: course.id.clone(),
                        course_title: course.title.clone(),
                        mistakes: 0,
                        questions: Vec::new(),
                    });
                entry.mistakes += 1;
                entry.questions.push(question.text.clone());
            }
        }

        let mut recommendations: Vec<LessonRecommendation> = by_lesson.into_values().collect();
        recommendations.sort_by(|a, b| {
            b.mistakes
                .cmp(&a.mistakes)
                .then_with(|| a.lesson_title.cmp(&b.lesson_title))
        });
        recommendations.truncate(RECOMMENDATION_LIMIT);

        Ok(StudentDashboard {
            completed: attempts.len() as i64,
            total: total as i64,
            average_score,
            recommendations,
        })
    }
}

fn unique(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::AppError,
        models::domain::{Answer, Question, RetakeRequest, User, UserRole},
        repositories::{
            MockCourseRepository, MockLessonRepository, MockQuizAttemptRepository,
            MockQuizRepository, MockRetakeRequestRepository, MockUserRepository,
        },
    };
    use chrono::{Duration, Utc};

    struct Mocks {
        courses: MockCourseRepository,
        lessons: MockLessonRepository,
        quizzes: MockQuizRepository,
        attempts: MockQuizAttemptRepository,
        requests: MockRetakeRequestRepository,
        users: MockUserRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                courses: MockCourseRepository::new(),
                lessons: MockLessonRepository::new(),
                quizzes: MockQuizRepository::new(),
                attempts: MockQuizAttemptRepository::new(),
                requests: MockRetakeRequestRepository::new(),
                users: MockUserRepository::new(),
            }
        }

        fn build(self, catalog_courses: MockCourseRepository) -> ReportService {
            let catalog = Arc::new(CatalogService::new(
                Arc::new(catalog_courses),
                Arc::new(MockLessonRepository::new()),
                Arc::new(MockQuizRepository::new()),
                Arc::new(MockRetakeRequestRepository::new()),
            ));
            ReportService::new(
                catalog,
                Arc::new(self.courses),
                Arc::new(self.lessons),
                Arc::new(self.quizzes),
                Arc::new(self.attempts),
                Arc::new(self.requests),
                Arc::new(self.users),
            )
        }
    }

    fn catalog_finding(course: &Course) -> MockCourseRepository {
        let course = course.clone();
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(course.clone())));
        courses
    }

    #[tokio::test]
    async fn test_student_report_orders_by_course_then_time() {
        let zoology = Course::new("Zoology", None, "t");
        let algebra = Course::new("Algebra", None, "t");
        let l1 = Lesson::new(&zoology.id, "Cats", "", 1);
        let l2 = Lesson::new(&algebra.id, "Rings", "", 1);
        let l3 = Lesson::new(&algebra.id, "Fields", "", 2);
        let q1 = Quiz::new(&l1.id, "Cats quiz");
        let q2 = Quiz::new(&l2.id, "Rings quiz");
        let q3 = Quiz::new(&l3.id, "Fields quiz");

        let now = Utc::now();
        let mut a1 = QuizAttempt::new("s", &q1.id, 10.0, vec![]);
        a1.completed_at = now - Duration::hours(3);
        let mut a2 = QuizAttempt::new("s", &q2.id, 20.0, vec![]);
        a2.completed_at = now;
        let mut a3 = QuizAttempt::new("s", &q3.id, 30.0, vec![]);
        a3.completed_at = now - Duration::hours(1);

        let mut m = Mocks::new();
        let attempts = vec![a1, a2, a3];
        m.attempts
            .expect_find_by_student()
            .returning(move |_| Ok(attempts.clone()));
        let quizzes = vec![q1, q2, q3];
        m.quizzes
            .expect_find_by_ids()
            .returning(move |_| Ok(quizzes.clone()));
        let lessons = vec![l1, l2, l3];
        m.lessons
            .expect_find_by_ids()
            .returning(move |_| Ok(lessons.clone()));
        let courses = vec![zoology, algebra];
        m.courses
            .expect_find_by_ids()
            .returning(move |_| Ok(courses.clone()));

        let svc = m.build(MockCourseRepository::new());
        let rows = svc
            .student_report(&Identity::new("s", UserRole::Student))
            .await
            .unwrap();

        let titles: Vec<&str> = rows.iter().map(|r| r.quiz_title.as_str()).collect();
        assert_eq!(titles, vec!["Fields quiz", "Rings quiz", "Cats quiz"]);
    }

    #[tokio::test]
    async fn test_gradebook_refuses_foreign_teacher() {
        let course = Course::new("Rust", None, "teacher-b");
        let mut m = Mocks::new();
        m.lessons.expect_find_by_course().never();

        let svc = m.build(catalog_finding(&course));
        let result = svc
            .course_gradebook(&Identity::new("teacher-a", UserRole::Teacher), &course.id)
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_gradebook_rows_carry_scores_and_pending_requests() {
        let mut course = Course::new("Rust", None, "teacher-1");
        let alice = User::new("alice", "h", UserRole::Student);
        let bob = User::new("bob", "h", UserRole::Student);
        course.student_ids = vec![alice.id.clone(), bob.id.clone()];

        let with_quiz = Lesson::new(&course.id, "Traits", "", 1);
        let without_quiz = Lesson::new(&course.id, "Reading", "", 2);
        let quiz = Quiz::new(&with_quiz.id, "Traits quiz");
        let attempt = QuizAttempt::new(&alice.id, &quiz.id, 80.0, vec![]);
        let pending = RetakeRequest::new(&alice.id, &quiz.id);
        let pending_id = pending.id.clone();

        let mut m = Mocks::new();
        let lessons = vec![with_quiz.clone(), without_quiz];
        m.lessons
            .expect_find_by_course()
            .returning(move |_| Ok(lessons.clone()));
        let quizzes = vec![quiz.clone()];
        m.quizzes
            .expect_find_by_lesson_ids()
            .returning(move |_| Ok(quizzes.clone()));
        m.attempts
            .expect_find_by_quizzes()
            .returning(move |_| Ok(vec![attempt.clone()]));
        m.requests
            .expect_find_by_quizzes()
            .returning(move |_| Ok(vec![pending.clone()]));
        let users = vec![alice.clone(), bob.clone()];
        m.users
            .expect_find_by_ids()
            .returning(move |_| Ok(users.clone()));

        let svc = m.build(catalog_finding(&course));
        let gradebook = svc
            .course_gradebook(&Identity::new("teacher-1", UserRole::Teacher), &course.id)
            .await
            .unwrap();

        assert_eq!(gradebook.quiz_lessons.len(), 1);
        assert_eq!(gradebook.rows.len(), 2);

        let alice_cell = &gradebook.rows[0].cells[0];
        assert_eq!(gradebook.rows[0].username, "alice");
        assert_eq!(alice_cell.score, Some(80.0));
        assert_eq!(alice_cell.retake_request_id, Some(pending_id));

        let bob_cell = &gradebook.rows[1].cells[0];
        assert_eq!(bob_cell.score, None);
        assert_eq!(bob_cell.retake_request_id, None);
    }

    #[tokio::test]
    async fn test_dashboard_ranks_lessons_by_mistakes() {
        let mut course = Course::new("Rust", None, "t");
        course.student_ids.push("s".to_string());
        let easy = Lesson::new(&course.id, "Easy", "", 1);
        let hard = Lesson::new(&course.id, "Hard", "", 2);

        let mut easy_quiz = Quiz::new(&easy.id, "Easy quiz");
        easy_quiz.questions = vec![
            Question::new("e1", vec![Answer::new("y", true)]),
            Question::new("e2", vec![Answer::new("y", true)]),
        ];
        let mut hard_quiz = Quiz::new(&hard.id, "Hard quiz");
        hard_quiz.questions = vec![
            Question::new("h1", vec![Answer::new("y", true)]),
            Question::new("h2", vec![Answer::new("y", true)]),
        ];

        let easy_attempt = QuizAttempt::new(
            "s",
            &easy_quiz.id,
            50.0,
            vec![easy_quiz.questions[0].id.clone()],
        );
        let hard_attempt = QuizAttempt::new(
            "s",
            &hard_quiz.id,
            0.0,
            hard_quiz.questions.iter().map(|q| q.id.clone()).collect(),
        );

        let mut m = Mocks::new();
        let enrolled = vec![course.clone()];
        m.courses
            .expect_find_by_student()
            .returning(move |_| Ok(enrolled.clone()));
        let all_courses = vec![course.clone()];
        m.courses
            .expect_find_by_ids()
            .returning(move |_| Ok(all_courses.clone()));
        let lessons = vec![easy.clone(), hard.clone()];
        let lessons_for_course = lessons.clone();
        m.lessons
            .expect_find_by_course()
            .returning(move |_| Ok(lessons_for_course.clone()));
        m.lessons
            .expect_find_by_ids()
            .returning(move |_| Ok(lessons.clone()));
        let quizzes = vec![easy_quiz.clone(), hard_quiz.clone()];
        let quizzes_by_lesson = quizzes.clone();
        m.quizzes
            .expect_find_by_lesson_ids()
            .returning(move |_| Ok(quizzes_by_lesson.clone()));
        m.quizzes
            .expect_find_by_ids()
            .returning(move |_| Ok(quizzes.clone()));
        let attempts = vec![easy_attempt, hard_attempt];
        m.attempts
            .expect_find_by_student()
            .returning(move |_| Ok(attempts.clone()));

        let svc = m.build(MockCourseRepository::new());
        let dashboard = svc
            .student_dashboard(&Identity::new("s", UserRole::Student))
            .await
            .unwrap();

        assert_eq!(dashboard.completed, 2);
        assert_eq!(dashboard.total, 2);
        assert_eq!(dashboard.average_score, 25.0);
        assert_eq!(dashboard.recommendations.len(), 2);
        assert_eq!(dashboard.recommendations[0].lesson_title, "Hard");
        assert_eq!(dashboard.recommendations[0].mistakes, 2);
        assert_eq!(dashboard.recommendations[0].questions, vec!["h1", "h2"]);
        assert_eq!(dashboard.recommendations[1].mistakes, 1);
    }

    #[tokio::test]
    async fn test_dashboard_without_attempts_averages_zero() {
        let mut m = Mocks::new();
        m.courses.expect_find_by_student().returning(|_| Ok(vec![]));
        m.attempts.expect_find_by_student().returning(|_| Ok(vec![]));
        m.quizzes.expect_find_by_ids().returning(|_| Ok(vec![]));
        m.lessons.expect_find_by_ids().returning(|_| Ok(vec![]));
        m.courses.expect_find_by_ids().returning(|_| Ok(vec![]));

        let svc = m.build(MockCourseRepository::new());
        let dashboard = svc
            .student_dashboard(&Identity::new("s", UserRole::Student))
            .await
            .unwrap();

        assert_eq!(dashboard.completed, 0);
        assert_eq!(dashboard.total, 0);
        assert_eq!(dashboard.average_score, 0.0);
        assert!(dashboard.recommendations.is_empty());
    }
}
