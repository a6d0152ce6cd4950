use std::sync::Arc;

use crate::{
    auth::{require_student, require_teacher, Identity},
    errors::{AppError, AppResult},
    models::{
        domain::{QuizAttempt, RetakeRequest, RetakeState},
        dto::{
            request::SubmitQuizAttemptInput,
            response::{
                QuizAttemptResponse, QuizForTaking, RetakeOutcome, RetakeRequestResponse,
                TakeQuizResponse,
            },
        },
    },
    repositories::RetakeRequestRepository,
    services::{
        catalog_service::{require_enrolled_student, require_owner, CatalogService, QuizScope},
        quiz_attempt_service::QuizAttemptService,
    },
};

/// What the store currently holds for one (student, quiz) pair.
struct PairRecord {
    attempt: Option<QuizAttempt>,
    request: Option<RetakeRequest>,
}

impl PairRecord {
    fn state(&self) -> RetakeState {
        RetakeState::derive(self.attempt.as_ref(), self.request.as_ref())
    }
}

/// Gates taking and retaking quizzes and manages retake grants.
pub struct RetakeService {
    catalog: Arc<CatalogService>,
    attempts: Arc<QuizAttemptService>,
    requests: Arc<dyn RetakeRequestRepository>,
}

impl RetakeService {
    pub fn new(
        catalog: Arc<CatalogService>,
        attempts: Arc<QuizAttemptService>,
        requests: Arc<dyn RetakeRequestRepository>,
    ) -> Self {
        Self {
            catalog,
            attempts,
            requests,
        }
    }

    async fn student_scope(&self, identity: &Identity, quiz_id: &str) -> AppResult<QuizScope> {
        require_student(identity)?;
        let scope = self.catalog.quiz_scope(quiz_id).await?;
        require_enrolled_student(identity, &scope.course)?;
        Ok(scope)
    }

    async fn pair(&self, student_id: &str, quiz_id: &str) -> AppResult<PairRecord> {
        let attempt = self.attempts.latest_attempt(student_id, quiz_id).await?;
        let request = self
            .requests
            .find_by_student_and_quiz(student_id, quiz_id)
            .await?;
        Ok(PairRecord { attempt, request })
    }

    pub async fn retake_state(&self, identity: &Identity, quiz_id: &str) -> AppResult<RetakeState> {
        let scope = self.student_scope(identity, quiz_id).await?;
        Ok(self.pair(&identity.id, &scope.quiz.id).await?.state())
    }

    pub async fn latest_attempt(
        &self,
        identity: &Identity,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttemptResponse>> {
        let scope = self.student_scope(identity, quiz_id).await?;
        let attempt = self
            .attempts
            .latest_attempt(&identity.id, &scope.quiz.id)
            .await?;
        Ok(attempt.map(QuizAttemptResponse::from))
    }

    /// Questions when a submission is allowed, otherwise the "already done"
    /// summary with the latest score.
    pub async fn quiz_for_taking(
        &self,
        identity: &Identity,
        quiz_id: &str,
    ) -> AppResult<TakeQuizResponse> {
        let scope = self.student_scope(identity, quiz_id).await?;
        let pair = self.pair(&identity.id, &scope.quiz.id).await?;
        let state = pair.state();

        let quiz = state
            .can_submit()
            .then(|| QuizForTaking::from_quiz(scope.quiz));

        Ok(TakeQuizResponse {
            state,
            quiz,
            latest_score: pair.attempt.map(|a| a.score),
            request_already_sent: state == RetakeState::AttemptedPending,
        })
    }

    /// Student-facing submission: a first attempt goes straight to the
    /// ledger, an approved retake is consumed, anything else is refused.
    pub async fn submit_attempt(
        &self,
        identity: &Identity,
        input: SubmitQuizAttemptInput,
    ) -> AppResult<QuizAttemptResponse> {
        let scope = self.student_scope(identity, &input.quiz_id).await?;
        let pair = self.pair(&identity.id, &scope.quiz.id).await?;
        let selections = input.selections();

        let attempt = match (pair.state(), pair.request) {
            (RetakeState::NeverAttempted, _) => {
                self.attempts
                    .submit(&identity.id, &scope.quiz, &selections)
                    .await?
            }
            (RetakeState::AttemptedApproved, Some(grant)) => {
                self.attempts
                    .submit_with_grant(&identity.id, &scope.quiz, &grant.id, &selections)
                    .await?
            }
            (state, _) => return Err(blocked(&identity.id, &scope.quiz.id, state)),
        };

        Ok(attempt.into())
    }

    /// Retake-only submission. Refused unless an approved grant exists.
    pub async fn consume_retake_and_submit(
        &self,
        identity: &Identity,
        input: SubmitQuizAttemptInput,
    ) -> AppResult<QuizAttemptResponse> {
        let scope = self.student_scope(identity, &input.quiz_id).await?;
        let pair = self.pair(&identity.id, &scope.quiz.id).await?;

        let grant = match (pair.state(), pair.request) {
            (RetakeState::AttemptedApproved, Some(grant)) => grant,
            (state, _) => return Err(blocked(&identity.id, &scope.quiz.id, state)),
        };

        let attempt = self
            .attempts
            .submit_with_grant(&identity.id, &scope.quiz, &grant.id, &input.selections())
            .await?;

        Ok(attempt.into())
    }

    pub async fn request_retake(
        &self,
        identity: &Identity,
        quiz_id: &str,
    ) -> AppResult<RetakeRequestResponse> {
        let scope = self.student_scope(identity, quiz_id).await?;
        let pair = self.pair(&identity.id, &scope.quiz.id).await?;

        match pair.state() {
            RetakeState::NeverAttempted => {
                log::warn!(
                    "Student {} asked to retake quiz {} without an attempt",
                    identity.id,
                    scope.quiz.id
                );
                return Err(AppError::InvalidState(
                    "Take the quiz before requesting a retake".to_string(),
                ));
            }
            RetakeState::AttemptedNoRequest => {}
            RetakeState::AttemptedPending | RetakeState::AttemptedApproved => {
                if let Some(existing) = pair.request {
                    return Ok(RetakeRequestResponse::new(
                        RetakeOutcome::AlreadyRequested,
                        existing,
                    ));
                }
            }
        }

        match self
            .requests
            .create(RetakeRequest::new(&identity.id, &scope.quiz.id))
            .await
        {
            Ok(request) => {
                log::info!(
                    "Student {} requested a retake of quiz {} ({})",
                    identity.id,
                    scope.quiz.id,
                    request.id
                );
                Ok(RetakeRequestResponse::new(RetakeOutcome::Created, request))
            }
            // A concurrent call created it first.
            Err(AppError::AlreadyExists(_)) => {
                let existing = self
                    .requests
                    .find_by_student_and_quiz(&identity.id, &scope.quiz.id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InvalidState("Retake request changed concurrently".to_string())
                    })?;
                Ok(RetakeRequestResponse::new(
                    RetakeOutcome::AlreadyRequested,
                    existing,
                ))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn approve_retake(
        &self,
        identity: &Identity,
        request_id: &str,
    ) -> AppResult<RetakeRequestResponse> {
        require_teacher(identity)?;

        let request = self.find_request(request_id).await?;
        let scope = self.catalog.quiz_scope(&request.quiz_id).await?;
        require_owner(identity, &scope.course)?;

        if request.approved {
            return Ok(RetakeRequestResponse::new(
                RetakeOutcome::AlreadyApproved,
                request,
            ));
        }

        if self.requests.approve(&request.id).await? {
            log::info!(
                "Teacher {} approved retake {} for student {} on quiz {}",
                identity.id,
                request.id,
                request.student_id,
                request.quiz_id
            );
            let approved = RetakeRequest {
                approved: true,
                ..request
            };
            return Ok(RetakeRequestResponse::new(RetakeOutcome::Approved, approved));
        }

        // Lost to a concurrent approval, or the grant was already spent.
        let current = self.find_request(request_id).await?;
        Ok(RetakeRequestResponse::new(
            RetakeOutcome::AlreadyApproved,
            current,
        ))
    }

    async fn find_request(&self, request_id: &str) -> AppResult<RetakeRequest> {
        self.requests.find_by_id(request_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Retake request with id '{}' not found", request_id))
        })
    }
}

fn blocked(student_id: &str, quiz_id: &str, state: RetakeState) -> AppError {
    log::warn!(
        "Student {} refused submission on quiz {} in state {:?}",
        student_id,
        quiz_id,
        state
    );
    let reason = match state {
        RetakeState::AttemptedPending => "Retake request is still waiting for approval",
        RetakeState::AttemptedNoRequest => {
            "Quiz already attempted; request a retake to try again"
        }
        RetakeState::NeverAttempted => "Quiz has not been attempted yet; no retake to consume",
        RetakeState::AttemptedApproved => "Retake grant is no longer available",
    };
    AppError::InvalidState(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Answer, Course, Lesson, Question, Quiz, UserRole},
        repositories::{
            MockCourseRepository, MockLessonRepository, MockQuizAttemptRepository,
            MockQuizRepository, MockRetakeRequestRepository,
        },
    };

    const STUDENT: &str = "student-1";
    const OWNER: &str = "teacher-b";

    struct World {
        course: Course,
        lesson: Lesson,
        quiz: Quiz,
    }

    fn world() -> World {
        let mut course = Course::new("Rust", None, OWNER);
        course.student_ids.push(STUDENT.to_string());
        let lesson = Lesson::new(&course.id, "Traits", "content", 1);
        let mut quiz = Quiz::new(&lesson.id, "Traits quiz");
        quiz.questions.push(Question::new(
            "What is a trait?",
            vec![Answer::new("An interface", true), Answer::new("A type", false)],
        ));
        World {
            course,
            lesson,
            quiz,
        }
    }

    fn catalog(w: &World) -> Arc<CatalogService> {
        let (course, lesson, quiz) = (w.course.clone(), w.lesson.clone(), w.quiz.clone());

        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(course.clone())));
        let mut lessons = MockLessonRepository::new();
        lessons
            .expect_find_by_id()
            .returning(move |_| Ok(Some(lesson.clone())));
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));

        Arc::new(CatalogService::new(
            Arc::new(courses),
            Arc::new(lessons),
            Arc::new(quizzes),
            Arc::new(MockRetakeRequestRepository::new()),
        ))
    }

    fn service(
        w: &World,
        attempts: MockQuizAttemptRepository,
        requests: MockRetakeRequestRepository,
    ) -> RetakeService {
        RetakeService::new(
            catalog(w),
            Arc::new(QuizAttemptService::new(Arc::new(attempts))),
            Arc::new(requests),
        )
    }

    fn student() -> Identity {
        Identity::new(STUDENT, UserRole::Student)
    }

    fn submit_input(w: &World) -> SubmitQuizAttemptInput {
        SubmitQuizAttemptInput {
            quiz_id: w.quiz.id.clone(),
            answers: vec![],
        }
    }

    fn with_attempt(w: &World) -> MockQuizAttemptRepository {
        let attempt = QuizAttempt::new(STUDENT, &w.quiz.id, 40.0, vec![]);
        let mut attempts = MockQuizAttemptRepository::new();
        attempts
            .expect_find_latest()
            .returning(move |_, _| Ok(Some(attempt.clone())));
        attempts
    }

    fn with_request(w: &World, approved: bool) -> (MockRetakeRequestRepository, RetakeRequest) {
        let mut request = RetakeRequest::new(STUDENT, &w.quiz.id);
        request.approved = approved;
        let found = request.clone();

        let mut requests = MockRetakeRequestRepository::new();
        requests
            .expect_find_by_student_and_quiz()
            .returning(move |_, _| Ok(Some(found.clone())));
        let by_id = request.clone();
        requests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(by_id.clone())));
        (requests, request)
    }

    fn no_request() -> MockRetakeRequestRepository {
        let mut requests = MockRetakeRequestRepository::new();
        requests
            .expect_find_by_student_and_quiz()
            .returning(|_, _| Ok(None));
        requests
    }

    #[tokio::test]
    async fn test_resubmit_without_grant_is_refused() {
        let w = world();
        let mut attempts = with_attempt(&w);
        attempts.expect_create_first().never();
        attempts.expect_replace_with_grant().never();

        let svc = service(&w, attempts, no_request());
        let result = svc.submit_attempt(&student(), submit_input(&w)).await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_pending_request_blocks_submission() {
        let w = world();
        let mut attempts = with_attempt(&w);
        attempts.expect_replace_with_grant().never();
        let (requests, _) = with_request(&w, false);

        let svc = service(&w, attempts, requests);
        let result = svc.submit_attempt(&student(), submit_input(&w)).await;

        match result {
            Err(AppError::InvalidState(msg)) => assert!(msg.contains("waiting for approval")),
            other => panic!("expected InvalidState, got {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn test_approved_grant_is_consumed_on_submit() {
        let w = world();
        let mut attempts = with_attempt(&w);
        let (requests, grant) = with_request(&w, true);
        let grant_id = grant.id.clone();
        attempts
            .expect_replace_with_grant()
            .withf(move |id, _| id == grant_id)
            .times(1)
            .returning(|_, attempt| Ok(attempt));

        let svc = service(&w, attempts, requests);
        let attempt = svc.submit_attempt(&student(), submit_input(&w)).await.unwrap();

        assert_eq!(attempt.quiz_id, w.quiz.id);
        assert_eq!(attempt.score, 0.0);
    }

    #[tokio::test]
    async fn test_first_submission_goes_to_ledger() {
        let w = world();
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_latest().returning(|_, _| Ok(None));
        attempts.expect_create_first().times(1).returning(Ok);
        attempts.expect_replace_with_grant().never();

        let svc = service(&w, attempts, no_request());
        let mut input = submit_input(&w);
        input.answers = vec![crate::models::dto::request::SelectedAnswerInput {
            question_id: w.quiz.questions[0].id.clone(),
            answer_id: w.quiz.questions[0].answers[0].id.clone(),
        }];

        let attempt = svc.submit_attempt(&student(), input).await.unwrap();
        assert_eq!(attempt.score, 100.0);
    }

    #[tokio::test]
    async fn test_consume_requires_approved_grant() {
        let w = world();
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_latest().returning(|_, _| Ok(None));
        attempts.expect_replace_with_grant().never();

        let svc = service(&w, attempts, no_request());
        let result = svc
            .consume_retake_and_submit(&student(), submit_input(&w))
            .await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_teacher_cannot_submit() {
        let w = world();
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_latest().never();

        let svc = service(&w, attempts, MockRetakeRequestRepository::new());
        let result = svc
            .submit_attempt(&Identity::new(OWNER, UserRole::Teacher), submit_input(&w))
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_unenrolled_student_is_refused() {
        let w = world();
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_latest().never();

        let svc = service(&w, attempts, MockRetakeRequestRepository::new());
        let result = svc
            .quiz_for_taking(&Identity::new("stranger", UserRole::Student), &w.quiz.id)
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_request_retake_is_idempotent_when_pending() {
        let w = world();
        let (mut requests, existing) = with_request(&w, false);
        requests.expect_create().never();

        let svc = service(&w, with_attempt(&w), requests);
        let response = svc.request_retake(&student(), &w.quiz.id).await.unwrap();

        assert_eq!(response.outcome, RetakeOutcome::AlreadyRequested);
        assert_eq!(response.request.id, existing.id);
    }

    #[tokio::test]
    async fn test_request_retake_creates_pending_request() {
        let w = world();
        let mut requests = no_request();
        requests.expect_create().times(1).returning(Ok);

        let svc = service(&w, with_attempt(&w), requests);
        let response = svc.request_retake(&student(), &w.quiz.id).await.unwrap();

        assert_eq!(response.outcome, RetakeOutcome::Created);
        assert!(!response.request.approved);
    }

    #[tokio::test]
    async fn test_request_retake_before_attempt_is_invalid() {
        let w = world();
        let mut attempts = MockQuizAttemptRepository::new();
        attempts.expect_find_latest().returning(|_, _| Ok(None));
        let mut requests = no_request();
        requests.expect_create().never();

        let svc = service(&w, attempts, requests);
        let result = svc.request_retake(&student(), &w.quiz.id).await;

        assert!(matches!(result, Err(AppError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_request_retake_race_reports_existing() {
        let w = world();
        let winner = RetakeRequest::new(STUDENT, &w.quiz.id);
        let winner_id = winner.id.clone();

        let mut requests = MockRetakeRequestRepository::new();
        let mut seq = mockall::Sequence::new();
        requests
            .expect_find_by_student_and_quiz()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));
        requests
            .expect_create()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::AlreadyExists("dup".to_string())));
        requests
            .expect_find_by_student_and_quiz()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| Ok(Some(winner.clone())));

        let svc = service(&w, with_attempt(&w), requests);
        let response = svc.request_retake(&student(), &w.quiz.id).await.unwrap();

        assert_eq!(response.outcome, RetakeOutcome::AlreadyRequested);
        assert_eq!(response.request.id, winner_id);
    }

    #[tokio::test]
    async fn test_non_owner_approve_never_flips_flag() {
        let w = world();
        let (mut requests, request) = with_request(&w, false);
        requests.expect_approve().never();

        let svc = service(&w, MockQuizAttemptRepository::new(), requests);
        let result = svc
            .approve_retake(&Identity::new("teacher-a", UserRole::Teacher), &request.id)
            .await;

        assert!(matches!(result, Err(AppError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_owner_approves_pending_request() {
        let w = world();
        let (mut requests, request) = with_request(&w, false);
        requests.expect_approve().times(1).returning(|_| Ok(true));

        let svc = service(&w, MockQuizAttemptRepository::new(), requests);
        let response = svc
            .approve_retake(&Identity::new(OWNER, UserRole::Teacher), &request.id)
            .await
            .unwrap();

        assert_eq!(response.outcome, RetakeOutcome::Approved);
        assert!(response.request.approved);
    }

    #[tokio::test]
    async fn test_approve_twice_is_informational() {
        let w = world();
        let (mut requests, request) = with_request(&w, true);
        requests.expect_approve().never();

        let svc = service(&w, MockQuizAttemptRepository::new(), requests);
        let response = svc
            .approve_retake(&Identity::new(OWNER, UserRole::Teacher), &request.id)
            .await
            .unwrap();

        assert_eq!(response.outcome, RetakeOutcome::AlreadyApproved);
    }

    #[tokio::test]
    async fn test_approve_unknown_request_is_not_found() {
        let w = world();
        let mut requests = MockRetakeRequestRepository::new();
        requests.expect_find_by_id().returning(|_| Ok(None));

        let svc = service(&w, MockQuizAttemptRepository::new(), requests);
        let result = svc
            .approve_retake(&Identity::new(OWNER, UserRole::Teacher), "missing")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_quiz_for_taking_hides_questions_once_attempted() {
        let w = world();
        let (requests, _) = with_request(&w, false);

        let svc = service(&w, with_attempt(&w), requests);
        let view = svc.quiz_for_taking(&student(), &w.quiz.id).await.unwrap();

        assert_eq!(view.state, RetakeState::AttemptedPending);
        assert!(view.quiz.is_none());
        assert_eq!(view.latest_score, Some(40.0));
        assert!(view.request_already_sent);
    }
}
