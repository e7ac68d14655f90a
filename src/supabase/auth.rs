use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{SupabaseClient, error_message};
use crate::{
    auth::{AuthBackend, AuthError, AuthResult, AuthSession},
    models::AuthenticatedUser,
};

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl From<GoTrueUser> for AuthenticatedUser {
    fn from(user: GoTrueUser) -> Self {
        AuthenticatedUser {
            id: user.id,
            email: user.email,
            full_name: user.user_metadata.and_then(|m| m.full_name),
        }
    }
}

/// `/token` always wraps the user; `/signup` returns the bare user when
/// email confirmation is pending.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SessionOrUser {
    Session { access_token: String, user: GoTrueUser },
    User(GoTrueUser),
}

impl From<SessionOrUser> for AuthSession {
    fn from(value: SessionOrUser) -> Self {
        match value {
            SessionOrUser::Session { access_token, user } => {
                AuthSession { user: user.into(), access_token: Some(access_token) }
            },
            SessionOrUser::User(user) => AuthSession { user: user.into(), access_token: None },
        }
    }
}

impl SupabaseClient {
    async fn auth_call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> AuthResult<reqwest::Response> {
        if !self.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        let mut req = self.request(method, path, token);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(AuthError::Rejected(error_message(resp).await))
        }
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<AuthSession> {
        let body = json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });
        let resp = self.auth_call(Method::POST, "/auth/v1/signup", None, Some(body)).await?;
        let session: SessionOrUser = resp.json().await?;
        Ok(session.into())
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let body = json!({ "email": email, "password": password });
        let resp = self
            .auth_call(Method::POST, "/auth/v1/token?grant_type=password", None, Some(body))
            .await?;
        let session: SessionOrUser = resp.json().await?;
        Ok(session.into())
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        self.auth_call(Method::POST, "/auth/v1/logout", Some(access_token), None).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> AuthResult<Option<AuthenticatedUser>> {
        if !self.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        let resp = self.request(Method::GET, "/auth/v1/user", Some(access_token)).send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("stored access token no longer accepted");
                Ok(None)
            },
            s if s.is_success() => Ok(Some(resp.json::<GoTrueUser>().await?.into())),
            _ => Err(AuthError::Rejected(error_message(resp).await)),
        }
    }

    async fn update_profile(
        &self,
        access_token: &str,
        full_name: &str,
    ) -> AuthResult<AuthenticatedUser> {
        let body = json!({ "data": { "full_name": full_name } });
        let resp =
            self.auth_call(Method::PUT, "/auth/v1/user", Some(access_token), Some(body)).await?;
        Ok(resp.json::<GoTrueUser>().await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_response_carries_session() {
        let json = r#"{"access_token": "jwt", "token_type": "bearer", "expires_in": 3600,
            "user": {"id": "u1", "email": "ana@example.com", "user_metadata": {"full_name": "Ana"}}}"#;
        let session: AuthSession = serde_json::from_str::<SessionOrUser>(json).unwrap().into();
        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert_eq!(session.user.full_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn unconfirmed_signup_has_no_token() {
        let json = r#"{"id": "u2", "email": "leo@example.com", "user_metadata": {}}"#;
        let session: AuthSession = serde_json::from_str::<SessionOrUser>(json).unwrap().into();
        assert_eq!(session.access_token, None);
        assert_eq!(session.user.id, "u2");
        assert_eq!(session.user.full_name, None);
    }

    #[tokio::test]
    async fn unconfigured_client_refuses() {
        let client = SupabaseClient::new(reqwest::Client::new(), String::new(), String::new());
        let err = client.sign_in("a@b.c", "secret").await.unwrap_err();
        assert!(matches!(err, AuthError::NotConfigured));
        assert!(matches!(client.current_user("t").await, Err(AuthError::NotConfigured)));
    }
}
