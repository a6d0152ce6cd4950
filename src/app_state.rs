use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoCourseRepository, MongoLessonRepository, MongoQuizAttemptRepository,
        MongoQuizRepository, MongoRetakeRequestRepository, MongoUserRepository, UserRepository,
    },
    services::{
        catalog_service::CatalogService, quiz_attempt_service::QuizAttemptService,
        quiz_service::QuizService, report_service::ReportService, retake_service::RetakeService,
        user_service::UserService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub catalog_service: Arc<CatalogService>,
    pub quiz_service: Arc<QuizService>,
    pub retake_service: Arc<RetakeService>,
    pub report_service: Arc<ReportService>,
    pub jwt_service: Arc<JwtService>,
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let users = Arc::new(MongoUserRepository::new(&db));
        users.ensure_indexes().await?;
        let courses = Arc::new(MongoCourseRepository::new(&db));
        courses.ensure_indexes().await?;
        let lessons = Arc::new(MongoLessonRepository::new(&db));
        lessons.ensure_indexes().await?;
        let quizzes = Arc::new(MongoQuizRepository::new(&db));
        quizzes.ensure_indexes().await?;
        let attempts = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempts.ensure_indexes().await?;
        let requests = Arc::new(MongoRetakeRequestRepository::new(&db));
        requests.ensure_indexes().await?;

        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_expiration_hours,
        ));

        let user_service = Arc::new(UserService::new(users.clone(), jwt_service.clone()));
        let catalog_service = Arc::new(CatalogService::new(
            courses.clone(),
            lessons.clone(),
            quizzes.clone(),
            requests.clone(),
        ));
        let quiz_service = Arc::new(QuizService::new(quizzes.clone(), catalog_service.clone()));
        let attempt_service = Arc::new(QuizAttemptService::new(attempts.clone()));
        let retake_service = Arc::new(RetakeService::new(
            catalog_service.clone(),
            attempt_service,
            requests.clone(),
        ));
        let report_service = Arc::new(ReportService::new(
            catalog_service.clone(),
            courses,
            lessons,
            quizzes,
            attempts,
            requests,
            users,
        ));

        Ok(Self {
            user_service,
            catalog_service,
            quiz_service,
            retake_service,
            report_service,
            jwt_service,
            db,
            config: Arc::new(config),
        })
    }
}
