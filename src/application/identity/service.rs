//! User management service
//!
//! HTTP handlers are thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::info;
use validator::ValidateEmail;

use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, RepositoryProvider, UpdateUserDto, User,
    UserRole,
};
use crate::infrastructure::crypto::jwt::{create_token, JwtConfig};
use crate::infrastructure::crypto::password::{hash_password, verify_password};
use crate::shared::PaginatedResult;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

pub struct UserService {
    repos: Arc<dyn RepositoryProvider>,
    jwt_config: JwtConfig,
}

fn validate_profile(name: &str, email: &str) -> DomainResult<()> {
    let name_len = name.trim().chars().count();
    if name_len == 0 || name_len > 100 {
        return Err(DomainError::Validation("Name must be 1-100 characters".into()));
    }
    if !email.validate_email() {
        return Err(DomainError::Validation("Invalid email address".into()));
    }
    Ok(())
}

fn validate_password(password: &str) -> DomainResult<()> {
    if password.chars().count() < 6 {
        return Err(DomainError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

fn hash(password: &str) -> DomainResult<String> {
    hash_password(password)
        .map_err(|e| DomainError::Unexpected(format!("Failed to hash password: {}", e)))
}

impl UserService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, jwt_config: JwtConfig) -> Self {
        Self { repos, jwt_config }
    }

    pub fn jwt_config(&self) -> &JwtConfig {
        &self.jwt_config
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate by email + password and return a JWT.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> DomainResult<AuthResult> {
        let Some(user) = self.repos.users().get_user_by_email(email.trim()).await? else {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
        };

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let token = create_token(&user.id, &user.email, user.role.as_str(), &self.jwt_config)
            .map_err(|e| DomainError::Unexpected(format!("Failed to create token: {}", e)))?;

        info!(user_id = %user.id, "User logged in");
        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new account with the `user` role.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> DomainResult<User> {
        self.create_account(name, email, password, UserRole::User).await
    }

    /// Create the configured admin account when no user exists yet.
    ///
    /// Returns `None` when the users table already has rows.
    pub async fn ensure_default_admin(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> DomainResult<Option<User>> {
        if self.repos.users().count_users().await? > 0 {
            return Ok(None);
        }
        let admin = self
            .create_account(name, email, password, UserRole::Admin)
            .await?;
        info!(user_id = %admin.id, email = %admin.email, "Default admin created");
        Ok(Some(admin))
    }

    async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> DomainResult<User> {
        let email = email.trim().to_lowercase();
        validate_profile(name, &email)?;
        validate_password(password)?;

        if self.repos.users().get_user_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict("Email already registered".into()));
        }

        let user = self
            .repos
            .users()
            .create_user(CreateUserDto {
                name: name.trim().to_string(),
                email,
                password_hash: hash(password)?,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = user.role.as_str(), "New user registered");
        Ok(user)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repos.users().list_users(dto).await
    }

    pub async fn get_user(&self, id: &str) -> DomainResult<User> {
        self.repos
            .users()
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))
    }

    // ── Commands ────────────────────────────────────────────────

    /// Update name, email and optionally the password.
    ///
    /// Users may edit themselves; admins may edit anyone.
    pub async fn update_user(
        &self,
        actor: &User,
        id: &str,
        name: Option<&str>,
        email: Option<&str>,
        password: Option<&str>,
    ) -> DomainResult<User> {
        if actor.id != id && !actor.is_admin() {
            return Err(DomainError::Forbidden(
                "You are not authorized to update this user".into(),
            ));
        }

        let current = self.get_user(id).await?;
        let email = email.map(|e| e.trim().to_lowercase());
        validate_profile(
            name.unwrap_or(&current.name),
            email.as_deref().unwrap_or(&current.email),
        )?;

        if let Some(new_email) = email.as_deref() {
            if new_email != current.email {
                if let Some(other) = self.repos.users().get_user_by_email(new_email).await? {
                    if other.id != id {
                        return Err(DomainError::Conflict("Email already registered".into()));
                    }
                }
            }
        }

        let password_hash = match password {
            Some(p) => {
                validate_password(p)?;
                Some(hash(p)?)
            }
            None => None,
        };

        let updated = self
            .repos
            .users()
            .update_user(
                id,
                UpdateUserDto {
                    name: name.map(|n| n.trim().to_string()),
                    email,
                    password_hash,
                },
            )
            .await?
            .ok_or_else(|| DomainError::UserNotFound(id.to_string()))?;

        info!(user_id = %id, actor_id = %actor.id, "User updated");
        Ok(updated)
    }

    pub async fn delete_user(&self, id: &str) -> DomainResult<()> {
        self.get_user(id).await?;
        self.repos.users().delete_user(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::crypto::jwt::verify_token;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn jwt() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            expiration_hours: 1,
            issuer: "parking-service".into(),
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryRepositoryProvider::new()), jwt())
    }

    #[tokio::test]
    async fn register_then_login() {
        let svc = service();
        let user = svc
            .register("Alice", "Alice@Example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.role, UserRole::User);
        assert_ne!(user.password_hash, "secret1");

        let auth = svc.login("alice@example.com", "secret1").await.unwrap();
        let claims = verify_token(&auth.token, &jwt()).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, "user");
        assert_eq!(auth.expires_in, 3600);
    }

    #[tokio::test]
    async fn login_errors_do_not_reveal_which_part_failed() {
        let svc = service();
        svc.register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let wrong_password = svc.login("alice@example.com", "nope123").await.unwrap_err();
        let unknown_email = svc.login("bob@example.com", "secret1").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn register_validates_and_rejects_duplicates() {
        let svc = service();
        assert!(matches!(
            svc.register("", "a@example.com", "secret1").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.register("A", "not-an-email", "secret1").await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            svc.register("A", "a@example.com", "short").await,
            Err(DomainError::Validation(_))
        ));

        svc.register("A", "a@example.com", "secret1").await.unwrap();
        assert!(matches!(
            svc.register("B", "A@example.com", "secret2").await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn default_admin_only_on_empty_table() {
        let svc = service();
        let admin = svc
            .ensure_default_admin("Admin", "admin@parking.local", "admin123")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());

        assert!(svc
            .ensure_default_admin("Admin", "admin2@parking.local", "admin123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn users_update_themselves_admins_update_anyone() {
        let svc = service();
        let admin = svc
            .ensure_default_admin("Admin", "admin@parking.local", "admin123")
            .await
            .unwrap()
            .unwrap();
        let alice = svc.register("Alice", "alice@example.com", "secret1").await.unwrap();
        let bob = svc.register("Bob", "bob@example.com", "secret1").await.unwrap();

        assert!(matches!(
            svc.update_user(&alice, &bob.id, Some("Eve"), None, None).await,
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            svc.update_user(&alice, &alice.id, None, Some("bob@example.com"), None)
                .await,
            Err(DomainError::Conflict(_))
        ));

        let renamed = svc
            .update_user(&alice, &alice.id, Some("Alice B"), None, Some("newpass1"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Alice B");
        svc.login("alice@example.com", "newpass1").await.unwrap();

        let by_admin = svc
            .update_user(&admin, &bob.id, None, Some("robert@example.com"), None)
            .await
            .unwrap();
        assert_eq!(by_admin.email, "robert@example.com");
    }

    #[tokio::test]
    async fn delete_missing_user() {
        let svc = service();
        assert!(matches!(
            svc.delete_user("missing").await,
            Err(DomainError::UserNotFound(_))
        ));
    }
}
