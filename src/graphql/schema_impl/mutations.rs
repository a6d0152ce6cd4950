use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    graphql::helpers::{state_and_identity, GraphqlResultExt},
    models::{
        domain::Quiz,
        dto::{
            request::{
                AddQuestionInput, CreateCourseInput, CreateLessonInput, CreateQuizInput,
                LoginRequest, RegisterRequest, SetAnswersInput, SubmitQuizAttemptInput,
            },
            response::{
                AuthResponse, CourseDto, LessonDto, QuizAttemptResponse, RetakeRequestResponse,
                UserDto,
            },
        },
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn register(
        &self,
        ctx: &Context<'_>,
        input: RegisterRequest,
    ) -> async_graphql::Result<UserDto> {
        let state = ctx.data::<AppState>()?;
        state.user_service.register(input).await.gql()
    }

    async fn login(&self, ctx: &Context<'_>, input: LoginRequest) -> async_graphql::Result<AuthResponse> {
        let state = ctx.data::<AppState>()?;
        state.user_service.login(input).await.gql()
    }

    async fn create_course(
        &self,
        ctx: &Context<'_>,
        input: CreateCourseInput,
    ) -> async_graphql::Result<CourseDto> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.create_course(&identity, input).await.gql()
    }

    async fn add_lesson(
        &self,
        ctx: &Context<'_>,
        input: CreateLessonInput,
    ) -> async_graphql::Result<LessonDto> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.add_lesson(&identity, input).await.gql()
    }

    async fn enroll(&self, ctx: &Context<'_>, course_id: ID) -> async_graphql::Result<CourseDto> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.enroll(&identity, &course_id).await.gql()
    }

    async fn create_quiz(
        &self,
        ctx: &Context<'_>,
        input: CreateQuizInput,
    ) -> async_graphql::Result<Quiz> {
        let (state, identity) = state_and_identity(ctx)?;
        state.quiz_service.create_quiz(&identity, input).await.gql()
    }

    async fn add_question(
        &self,
        ctx: &Context<'_>,
        input: AddQuestionInput,
    ) -> async_graphql::Result<Quiz> {
        let (state, identity) = state_and_identity(ctx)?;
        state.quiz_service.add_question(&identity, input).await.gql()
    }

    async fn set_answers(
        &self,
        ctx: &Context<'_>,
        input: SetAnswersInput,
    ) -> async_graphql::Result<Quiz> {
        let (state, identity) = state_and_identity(ctx)?;
        state.quiz_service.set_answers(&identity, input).await.gql()
    }

    async fn remove_question(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
        question_id: ID,
    ) -> async_graphql::Result<Quiz> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .quiz_service
            .remove_question(&identity, &quiz_id, &question_id)
            .await
            .gql()
    }

    /// First attempt, or a retake when an approved request exists.
    async fn submit_quiz_attempt(
        &self,
        ctx: &Context<'_>,
        input: SubmitQuizAttemptInput,
    ) -> async_graphql::Result<QuizAttemptResponse> {
        let (state, identity) = state_and_identity(ctx)?;
        state.retake_service.submit_attempt(&identity, input).await.gql()
    }

    async fn consume_retake_and_submit(
        &self,
        ctx: &Context<'_>,
        input: SubmitQuizAttemptInput,
    ) -> async_graphql::Result<QuizAttemptResponse> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .consume_retake_and_submit(&identity, input)
            .await
            .gql()
    }

    async fn request_retake(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> async_graphql::Result<RetakeRequestResponse> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .request_retake(&identity, &quiz_id)
            .await
            .gql()
    }

    async fn approve_retake(
        &self,
        ctx: &Context<'_>,
        request_id: ID,
    ) -> async_graphql::Result<RetakeRequestResponse> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .approve_retake(&identity, &request_id)
            .await
            .gql()
    }
}
