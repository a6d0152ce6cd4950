use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::UserRole,
};

/// The authenticated caller, passed explicitly into every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub role: UserRole,
}

impl Identity {
    pub fn new(id: &str, role: UserRole) -> Self {
        Self {
            id: id.to_string(),
            role,
        }
    }
}

pub fn require_student(identity: &Identity) -> AppResult<()> {
    if !identity.role.can_take_quizzes() {
        return Err(AppError::PermissionDenied(
            "Only students can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_teacher(identity: &Identity) -> AppResult<()> {
    if !identity.role.can_manage_courses() {
        return Err(AppError::PermissionDenied(
            "Only teachers can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}

pub fn extract_identity(ctx: &Context<'_>) -> AppResult<Identity> {
    extract_claims_from_context(ctx).map(|claims| claims.identity())
}
