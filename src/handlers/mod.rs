pub mod auth_handler;
pub mod graphql_handler;
pub mod health_handler;

use actix_web::web;

use crate::auth::AuthMiddleware;

pub use auth_handler::{login, me, register};
pub use graphql_handler::{graphiql, graphql};
pub use health_handler::{health_check, health_check_live, health_check_ready};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(health_check_live)
        .service(health_check_ready)
        .service(register)
        .service(login)
        .service(web::scope("/api").wrap(AuthMiddleware).service(me))
        .service(graphql)
        .service(graphiql);
}
