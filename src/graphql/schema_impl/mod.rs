pub mod mutations;
pub mod queries;

use async_graphql::{EmptySubscription, Schema as GraphQLSchema};

use crate::app_state::AppState;

pub use mutations::MutationRoot;
pub use queries::QueryRoot;

pub type Schema = GraphQLSchema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn create_schema(app_state: AppState) -> Schema {
    GraphQLSchema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(app_state)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sdl() -> String {
        GraphQLSchema::build(QueryRoot, MutationRoot, EmptySubscription)
            .finish()
            .sdl()
    }

    #[test]
    fn test_schema_exposes_retake_workflow() {
        let sdl = sdl();
        for field in [
            "submitQuizAttempt",
            "consumeRetakeAndSubmit",
            "requestRetake",
            "approveRetake",
            "takeQuiz",
            "retakeState",
            "latestAttempt",
        ] {
            assert!(sdl.contains(field), "schema is missing {}", field);
        }
    }

    #[test]
    fn test_quiz_for_taking_has_no_correctness_flag() {
        let sdl = sdl();
        let start = sdl.find("type AnswerOption").expect("AnswerOption type");
        let end = start + sdl[start..].find('}').expect("closing brace");
        assert!(!sdl[start..end].contains("isCorrect"));
    }

    #[tokio::test]
    async fn test_unauthenticated_query_is_rejected() {
        let schema = GraphQLSchema::build(QueryRoot, MutationRoot, EmptySubscription).finish();
        let response = schema.execute("{ myCourses { id } }").await;
        assert!(!response.errors.is_empty());
    }
}
