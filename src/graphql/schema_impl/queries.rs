use async_graphql::{Context, Object, ID};

use crate::{
    graphql::helpers::{state_and_identity, GraphqlResultExt},
    models::{
        domain::{Quiz, RetakeState},
        dto::response::{
            AttemptReportRow, CourseDetail, CourseDto, CourseGradebook, LessonDetail,
            QuizAttemptResponse, StudentDashboard, TakeQuizResponse, UserDto,
        },
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn me(&self, ctx: &Context<'_>) -> async_graphql::Result<UserDto> {
        let (state, identity) = state_and_identity(ctx)?;
        state.user_service.get_user(&identity.id).await.gql()
    }

    async fn my_courses(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CourseDto>> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.my_courses(&identity).await.gql()
    }

    async fn available_courses(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<CourseDto>> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.available_courses(&identity).await.gql()
    }

    async fn course(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<CourseDetail> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.course_detail(&identity, &id).await.gql()
    }

    async fn lesson(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<LessonDetail> {
        let (state, identity) = state_and_identity(ctx)?;
        state.catalog_service.lesson_detail(&identity, &id).await.gql()
    }

    /// Full quiz with correct answers. Course teacher only.
    async fn quiz(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<Quiz> {
        let (state, identity) = state_and_identity(ctx)?;
        state.quiz_service.get_quiz(&identity, &id).await.gql()
    }

    async fn quiz_for_lesson(
        &self,
        ctx: &Context<'_>,
        lesson_id: ID,
    ) -> async_graphql::Result<Option<Quiz>> {
        let (state, identity) = state_and_identity(ctx)?;
        match state.quiz_service.quiz_for_lesson(&lesson_id).await.gql()? {
            Some(quiz) => state
                .quiz_service
                .get_quiz(&identity, &quiz.id)
                .await
                .map(Some)
                .gql(),
            None => Ok(None),
        }
    }

    async fn take_quiz(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> async_graphql::Result<TakeQuizResponse> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .quiz_for_taking(&identity, &quiz_id)
            .await
            .gql()
    }

    async fn retake_state(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> async_graphql::Result<RetakeState> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .retake_state(&identity, &quiz_id)
            .await
            .gql()
    }

    async fn latest_attempt(
        &self,
        ctx: &Context<'_>,
        quiz_id: ID,
    ) -> async_graphql::Result<Option<QuizAttemptResponse>> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .retake_service
            .latest_attempt(&identity, &quiz_id)
            .await
            .gql()
    }

    async fn student_report(
        &self,
        ctx: &Context<'_>,
    ) -> async_graphql::Result<Vec<AttemptReportRow>> {
        let (state, identity) = state_and_identity(ctx)?;
        state.report_service.student_report(&identity).await.gql()
    }

    async fn student_dashboard(&self, ctx: &Context<'_>) -> async_graphql::Result<StudentDashboard> {
        let (state, identity) = state_and_identity(ctx)?;
        state.report_service.student_dashboard(&identity).await.gql()
    }

    async fn course_gradebook(
        &self,
        ctx: &Context<'_>,
        course_id: ID,
    ) -> async_graphql::Result<CourseGradebook> {
        let (state, identity) = state_and_identity(ctx)?;
        state
            .report_service
            .course_gradebook(&identity, &course_id)
            .await
            .gql()
    }
}
