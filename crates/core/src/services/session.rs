//! Identity: registration, login and session tokens.

use agora_common::{AppError, AppResult, Config, IdGenerator};
use agora_db::{entities::user, repositories::UserRepository};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
}

/// Session token claims.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: String,
    username: String,
    exp: i64,
}

/// Input for registering a user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 20, message = "Username must be 6-20 characters"))]
    pub username: String,

    #[validate(length(min = 8, max = 128, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Input for logging in.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// An issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    pub max_age_secs: i64,
}

/// Session service for identity operations.
#[derive(Clone)]
pub struct SessionService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
    jwt_secret: String,
    session_ttl: Duration,
}

impl SessionService {
    /// Create a new session service.
    #[must_use]
    pub fn new(user_repo: UserRepository, config: &Config) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
            jwt_secret: config.auth.jwt_secret.clone(),
            session_ttl: Duration::hours(config.auth.session_ttl_hours),
        }
    }

    /// Register a new user.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;
        validate_username(&input.username)?;
        validate_password(&input.password)?;

        let email = input.email.trim().to_lowercase();

        if self.user_repo.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict("Username is already taken!".to_string()));
        }
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered!".to_string()));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            created_at: Set(Utc::now().into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Verify credentials and issue a session.
    ///
    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, input: LoginInput) -> AppResult<Session> {
        input.validate()?;

        let invalid = || AppError::Unauthorized;
        let user = self
            .user_repo
            .find_by_email(input.email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&input.password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Rejected login");
            return Err(invalid());
        }

        self.issue(&user)
    }

    /// Issue a signed session token for a user.
    pub fn issue(&self, user: &user::Model) -> AppResult<Session> {
        let claims = Claims {
            user_id: user.id.clone(),
            username: user.username.clone(),
            exp: (Utc::now() + self.session_ttl).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign session token: {e}")))?;

        Ok(Session {
            token,
            identity: Identity {
                user_id: claims.user_id,
                username: claims.username,
            },
            max_age_secs: self.session_ttl.num_seconds(),
        })
    }

    /// Verify a session token and check the user still exists.
    pub async fn authenticate(&self, token: &str) -> AppResult<Identity> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?
        .claims;

        let user = self
            .user_repo
            .find_by_id(&claims.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(Identity {
            user_id: user.id,
            username: user.username,
        })
    }
}

/// Usernames use `[A-Za-z0-9_-]` and are not purely numeric.
fn validate_username(username: &str) -> AppResult<()> {
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    if username.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Username cannot consist only of digits".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> AppResult<()> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if has_upper && has_lower && has_digit && has_special {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Password must contain an upper-case letter, a lower-case letter, a digit and one of {PASSWORD_SPECIALS}"
        )))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use agora_common::config::{
        AuthConfig, DatabaseConfig, PaginationConfig, RateLimitSettings, ServerConfig,
    };
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    pub(crate) fn create_test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                frontend_url: None,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                session_ttl_hours: 3,
                cookie_name: "authToken".to_string(),
                secure_cookie: false,
            },
            pagination: PaginationConfig::default(),
            rate_limit: RateLimitSettings::default(),
        }
    }

    fn create_test_user(password: &str) -> user::Model {
        user::Model {
            id: "user1".to_string(),
            username: "Alice_01".to_string(),
            username_lower: "alice_01".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> SessionService {
        let repo = UserRepository::new(Arc::new(db.into_connection()));
        SessionService::new(repo, &create_test_config())
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("Secret1!").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("Secret1!", &hash).unwrap());
        assert!(!verify_password("secret1!", &hash).unwrap());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("bob-the-builder").is_ok());
        assert!(validate_username("12345678").is_err());
        assert!(validate_username("alice 01").is_err());
        assert!(validate_username("alice!01").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret1!").is_ok());
        assert!(validate_password("secret1!").is_err());
        assert!(validate_password("SECRET1!").is_err());
        assert!(validate_password("Secrets!").is_err());
        assert!(validate_password("Secret12").is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("Secret1!")]]);

        let result = service(db)
            .register(RegisterInput {
                email: "new@example.com".to_string(),
                username: "alice_01".to_string(),
                password: "Secret1!".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(db)
            .register(RegisterInput {
                email: "not-an-email".to_string(),
                username: "alice_01".to_string(),
                password: "Secret1!".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_and_authenticate_round_trip() {
        let user = create_test_user("Secret1!");
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user.clone()], [user]]);
        let service = service(db);

        let session = service
            .login(LoginInput {
                email: "alice@example.com".to_string(),
                password: "Secret1!".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(session.max_age_secs, 3 * 3600);

        let identity = service.authenticate(&session.token).await.unwrap();
        assert_eq!(identity.user_id, "user1");
        assert_eq!(identity.username, "Alice_01");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("Secret1!")]]);

        let result = service(db)
            .login(LoginInput {
                email: "alice@example.com".to_string(),
                password: "Wrong1!!".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_garbage_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(db).authenticate("not.a.token").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
