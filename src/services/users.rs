//! Authentication and member management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, Role, User,
        UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member account
    pub async fn register(&self, data: RegisterRequest) -> AppResult<User> {
        let hash = hash_password(&data.password)?;
        let user = self.repository.users.create(&data, &hash, Role::Member).await?;
        tracing::info!("Member {} registered", user.username);
        Ok(user)
    }

    /// Authenticate by username or email and issue a JWT
    pub async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let user = self
            .repository
            .users
            .get_by_login(&request.username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !verify_password(&user.password, &request.password)? {
            tracing::debug!("Failed login for {}", request.username);
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt_expiration_hours * 3600,
            user,
        })
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        UserClaims::new(user, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Change own password, the current one is required
    pub async fn change_password(&self, user_id: i32, request: &ChangePasswordRequest) -> AppResult<()> {
        let user = self.repository.users.get_by_id(user_id).await?;
        if !verify_password(&user.password, &request.old_password)? {
            return Err(AppError::Validation("Current password is incorrect".to_string()));
        }
        let hash = hash_password(&request.new_password)?;
        self.repository.users.update_password(user_id, &hash).await
    }

    pub async fn list_members(&self, search: Option<&str>) -> AppResult<Vec<User>> {
        self.repository.users.list(search).await
    }

    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let user = self.repository.users.update_role(id, role).await?;
        tracing::info!("User {} is now {}", user.username, role);
        Ok(user)
    }

    pub async fn delete_member(&self, acting_user_id: i32, id: i32) -> AppResult<()> {
        if acting_user_id == id {
            return Err(AppError::Conflict("You cannot delete your own account".to_string()));
        }
        self.repository.users.delete(id).await?;
        tracing::info!("User {} deleted", id);
        Ok(())
    }

    /// Create the configured administrator account when it does not exist yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<()> {
        let (Some(username), Some(password)) = (
            self.config.bootstrap_admin_username.as_deref(),
            self.config.bootstrap_admin_password.as_deref(),
        ) else {
            return Ok(());
        };

        if self.repository.users.get_by_login(username).await?.is_some() {
            tracing::debug!("Bootstrap admin {} already exists", username);
            return Ok(());
        }

        let data = RegisterRequest {
            fullname: "Administrator".to_string(),
            username: username.to_string(),
            email: format!("{}@localhost", username),
            password: password.to_string(),
            address: None,
            phone: None,
        };
        let hash = hash_password(password)?;
        self.repository.users.create(&data, &hash, Role::Admin).await?;
        tracing::info!("Bootstrap admin {} created", username);
        Ok(())
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
