use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::{app_state::AppState, graphql::Schema};

/// Executes a GraphQL request. A valid bearer token puts its claims into the
/// request data; an absent or invalid one leaves the caller anonymous.
#[post("/graphql")]
pub async fn graphql(
    schema: web::Data<Schema>,
    state: web::Data<Arc<AppState>>,
    auth: Option<BearerAuth>,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();

    if let Some(auth) = auth {
        match state.jwt_service.validate_token(auth.token()) {
            Ok(claims) => request = request.data(claims),
            Err(err) => log::warn!("Ignoring bearer token on GraphQL request: {}", err),
        }
    }

    schema.execute(request).await.into()
}

#[get("/graphiql")]
pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
