//! # Auth Service
//!
//! Account registration, sign-in and profile lookups.
//!
//! ## Flow: Login
//!
//! ```text
//! 1. find user by email (case-insensitive)
//!                ↓
//! 2. verify Argon2 hash on a blocking thread
//!                ↓
//! 3. sign a session token
//! ```
//!
//! Unknown email and wrong password produce the same error, so the
//! endpoint does not reveal which addresses are registered.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{optional_text, parse_choice, ServiceError, ServiceResult};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::TokenIssuer;
use crate::db::{Role, UserRecord};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserProfile};
use crate::store::Store;
use crate::utils::{normalize_email, require_text, validate_email};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    store: Store,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Store, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Create an account and sign it in.
    ///
    /// ## Returns
    ///
    /// * `Ok(AuthResponse)` - Token and profile of the new account
    /// * `Err(ServiceError::Validation)` - Bad email, short password, blank name or bad role
    /// * `Err(ServiceError::Conflict)` - Email already registered
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthResponse> {
        let name = require_text("name", &request.name).map_err(ServiceError::Validation)?;
        validate_email(&request.email).map_err(ServiceError::Validation)?;
        let email = normalize_email(&request.email);

        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServiceError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let role = match request.role.as_deref() {
            None => Role::User,
            Some(text) => parse_choice::<Role>(text, Role::accepted)?,
        };
        if role == Role::Admin {
            warn!("Refused self-registration as admin for {}", email);
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_blocking(request.password).await?;
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            role,
            phone: optional_text(request.phone),
            created_at: now,
            updated_at: now,
        };

        // The unique index still guards a registration racing this one.
        self.store.insert_user(&user).await?;
        info!("Registered {} account {}", user.role, user.email);

        self.auth_response(&user)
    }

    /// Sign in with email and password.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        let email = normalize_email(&request.email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                debug!("Login for unknown email {}", email);
                return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
            }
        };

        let stored = user.password_hash.clone();
        let password = request.password;
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| ServiceError::Internal(format!("Password check aborted: {}", e)))?;

        if !matches {
            warn!("Failed login for {}", email);
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        info!("User {} signed in", user.email);
        self.auth_response(&user)
    }

    /// Profile of a signed-in user.
    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<UserProfile> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .map(|u| UserProfile::from(&u))
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    /// Every account, newest first.
    pub async fn list_users(&self) -> ServiceResult<Vec<UserProfile>> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// Create the configured admin account if it does not exist yet.
    ///
    /// Returns `true` when an account was created.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> ServiceResult<bool> {
        validate_email(email).map_err(ServiceError::Validation)?;
        let email = normalize_email(email);

        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            if existing.role != Role::Admin {
                warn!("Bootstrap admin email {} belongs to a {} account", email, existing.role);
            }
            return Ok(false);
        }

        let password_hash = hash_blocking(password.to_string()).await?;
        let now = Utc::now();
        let admin = UserRecord {
            id: Uuid::new_v4(),
            email,
            name: "Administrator".to_string(),
            password_hash,
            role: Role::Admin,
            phone: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&admin).await?;
        info!("Created admin account {}", admin.email);
        Ok(true)
    }

    fn auth_response(&self, user: &UserRecord) -> ServiceResult<AuthResponse> {
        let token = self.tokens.issue(user)?;
        Ok(AuthResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: self.tokens.lifetime_secs(),
            user: UserProfile::from(user),
        })
    }
}

async fn hash_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Internal(format!("Password hashing aborted: {}", e)))?
        .map_err(ServiceError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(Store::memory(), TokenIssuer::new("test-secret", 1))
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Asha Kulkarni".to_string(),
            email: email.to_string(),
            password: "s3cure-passphrase".to_string(),
            role: None,
            phone: None,
        }
    }

    #[actix_rt::test]
    async fn test_register_then_login() {
        let svc = service();
        let registered = svc.register(register_request("Asha@Example.com")).await.unwrap();
        assert_eq!(registered.user.email, "asha@example.com");
        assert_eq!(registered.user.role, Role::User);
        assert_eq!(registered.token_type, "Bearer");
        assert_eq!(registered.expires_in, 3600);

        let login = svc
            .login(LoginRequest {
                email: "ASHA@example.com".to_string(),
                password: "s3cure-passphrase".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(login.user.id, registered.user.id);
    }

    #[actix_rt::test]
    async fn test_register_rejects_duplicate_email() {
        let svc = service();
        svc.register(register_request("asha@example.com")).await.unwrap();
        let err = svc
            .register(register_request("ASHA@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let svc = service();

        let mut short = register_request("a@example.com");
        short.password = "short".to_string();
        assert_eq!(svc.register(short).await.unwrap_err().code(), "VALIDATION_ERROR");

        let mut blank = register_request("b@example.com");
        blank.name = "  ".to_string();
        assert_eq!(svc.register(blank).await.unwrap_err().code(), "VALIDATION_ERROR");

        let bad_email = register_request("not-an-email");
        assert_eq!(svc.register(bad_email).await.unwrap_err().code(), "VALIDATION_ERROR");

        let mut admin = register_request("c@example.com");
        admin.role = Some("admin".to_string());
        assert_eq!(svc.register(admin).await.unwrap_err().code(), "FORBIDDEN");

        let mut nominee = register_request("d@example.com");
        nominee.role = Some("nominee".to_string());
        assert_eq!(svc.register(nominee).await.unwrap().user.role, Role::Nominee);
    }

    #[actix_rt::test]
    async fn test_login_errors_are_indistinguishable() {
        let svc = service();
        svc.register(register_request("asha@example.com")).await.unwrap();

        let wrong_password = svc
            .login(LoginRequest {
                email: "asha@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        let unknown = svc
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "whatever1".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(wrong_password.code(), "UNAUTHORIZED");
        assert_eq!(wrong_password.to_string(), unknown.to_string());
    }

    #[actix_rt::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let svc = service();
        assert!(svc.bootstrap_admin("admin@lifevault.test", "admin-pass-1").await.unwrap());
        assert!(!svc.bootstrap_admin("ADMIN@lifevault.test", "admin-pass-1").await.unwrap());

        let users = svc.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].role, Role::Admin);
    }
}
