use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{hash_password, verify_password, JwtService},
    errors::{AppError, AppResult},
    models::{
        domain::User,
        dto::{
            request::{LoginRequest, RegisterRequest},
            response::{AuthResponse, UserDto},
        },
    },
    repositories::UserRepository,
};

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    jwt_service: Arc<JwtService>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            repository,
            jwt_service,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserDto> {
        request.validate()?;

        let username = request.username.trim();
        if self.repository.find_by_username(username).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "User with username '{}' already exists",
                username
            )));
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .repository
            .create(User::new(username, &password_hash, request.role))
            .await?;

        log::info!("Registered {:?} account {}", user.role, user.id);
        Ok(user.into())
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let user = self
            .repository
            .find_by_username(request.username.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &user.password_hash)? {
            log::warn!("Failed login for user {}", user.id);
            return Err(invalid());
        }

        let token = self.jwt_service.create_token(&user)?;

        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            user: user.into(),
        })
    }

    pub async fn get_user(&self, id: &str) -> AppResult<UserDto> {
        self.repository
            .find_by_id(id)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", id)))
    }
}
