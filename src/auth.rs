use crate::models::{AuthenticatedUser, RegistrationForm};

pub const MIN_PASSWORD_LEN: usize = 6;

pub const PASSWORDS_DIFFER: &str = "Las contraseñas no coinciden";
pub const PASSWORD_TOO_SHORT: &str = "La contraseña debe tener al menos 6 caracteres";

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    /// Rejected locally before any backend call.
    #[error("{0}")]
    Validation(&'static str),

    /// The backend answered and refused (bad credentials, taken email, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("authentication backend is not configured")]
    NotConfigured,

    #[error("authentication request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// What a successful sign-in or sign-up hands back.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSession {
    pub user: AuthenticatedUser,
    /// Absent when the backend requires email confirmation before issuing
    /// a session.
    pub access_token: Option<String>,
}

#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<AuthSession>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> AuthResult<()>;

    /// `None` when the token is unknown or expired.
    async fn current_user(&self, access_token: &str) -> AuthResult<Option<AuthenticatedUser>>;

    async fn update_profile(
        &self,
        access_token: &str,
        full_name: &str,
    ) -> AuthResult<AuthenticatedUser>;
}

/// Checks run before a registration reaches the backend. Mismatch is
/// reported ahead of length.
pub fn validate_registration(form: &RegistrationForm) -> AuthResult<()> {
    if form.password != form.confirm_password {
        return Err(AuthError::Validation(PASSWORDS_DIFFER));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(PASSWORD_TOO_SHORT));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(password: &str, confirm: &str) -> RegistrationForm {
        RegistrationForm {
            full_name: "Ana".into(),
            email: "ana@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn short_password_is_rejected() {
        let err = validate_registration(&form("abc12", "abc12")).unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_TOO_SHORT);
    }

    #[test]
    fn mismatch_is_reported_first() {
        let err = validate_registration(&form("abc", "xyz")).unwrap_err();
        assert_eq!(err.to_string(), PASSWORDS_DIFFER);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(validate_registration(&form("ñññññ", "ñññññ")).is_err());
        assert!(validate_registration(&form("ñññññn", "ñññññn")).is_ok());
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }
}
