use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{
    LocalBackend, now_sec,
    password::{hash_password, verify_password},
};
use crate::{
    auth::{AuthBackend, AuthError, AuthResult, AuthSession, normalize_email},
    entities::{sessions, users},
    models::AuthenticatedUser,
};

const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const ALREADY_REGISTERED: &str = "User already registered";

impl From<users::Model> for AuthenticatedUser {
    fn from(user: users::Model) -> Self {
        AuthenticatedUser { id: user.id, email: Some(user.email), full_name: user.full_name }
    }
}

impl LocalBackend {
    async fn open_session(&self, user: users::Model) -> AuthResult<AuthSession> {
        let token = Uuid::new_v4().to_string();
        sessions::ActiveModel {
            token: Set(token.clone()),
            user_id: Set(user.id.clone()),
            created_at: Set(now_sec()),
        }
        .insert(&self.db)
        .await?;
        Ok(AuthSession { user: user.into(), access_token: Some(token) })
    }

    async fn user_for_token(&self, token: &str) -> AuthResult<Option<users::Model>> {
        let Some(session) = sessions::Entity::find_by_id(token.to_string()).one(&self.db).await?
        else {
            return Ok(None);
        };
        Ok(users::Entity::find_by_id(session.user_id).one(&self.db).await?)
    }
}

#[async_trait::async_trait]
impl AuthBackend for LocalBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::Rejected("Email is required".into()));
        }

        let existing =
            users::Entity::find().filter(users::Column::Email.eq(email.as_str())).one(&self.db).await?;
        if existing.is_some() {
            return Err(AuthError::Rejected(ALREADY_REGISTERED.into()));
        }

        let password_hash = hash_password(password).map_err(|e| AuthError::Hash(e.to_string()))?;
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            email: Set(email),
            password_hash: Set(password_hash),
            full_name: Set(full_name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)),
            created_at: Set(now_sec()),
        }
        .insert(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "account created");
        self.open_session(user).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let email = normalize_email(email);
        let Some(user) =
            users::Entity::find().filter(users::Column::Email.eq(email.as_str())).one(&self.db).await?
        else {
            return Err(AuthError::Rejected(INVALID_CREDENTIALS.into()));
        };

        let ok = verify_password(password, &user.password_hash)
            .map_err(|e| AuthError::Hash(e.to_string()))?;
        if !ok {
            return Err(AuthError::Rejected(INVALID_CREDENTIALS.into()));
        }

        self.open_session(user).await
    }

    async fn sign_out(&self, access_token: &str) -> AuthResult<()> {
        sessions::Entity::delete_by_id(access_token.to_string()).exec(&self.db).await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> AuthResult<Option<AuthenticatedUser>> {
        Ok(self.user_for_token(access_token).await?.map(Into::into))
    }

    async fn update_profile(
        &self,
        access_token: &str,
        full_name: &str,
    ) -> AuthResult<AuthenticatedUser> {
        let Some(user) = self.user_for_token(access_token).await? else {
            return Err(AuthError::Rejected("Session expired".into()));
        };

        let trimmed = full_name.trim();
        let mut active: users::ActiveModel = user.into();
        active.full_name = Set((!trimmed.is_empty()).then(|| trimmed.to_string()));
        Ok(active.update(&self.db).await?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    async fn backend() -> LocalBackend {
        LocalBackend::new(connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = backend().await;
        let created = auth.sign_up(" Ana@Example.com ", "palomitas", Some("Ana")).await.unwrap();
        assert_eq!(created.user.email.as_deref(), Some("ana@example.com"));
        assert!(created.access_token.is_some());

        let session = auth.sign_in("ana@example.com", "palomitas").await.unwrap();
        assert_eq!(session.user.id, created.user.id);
        assert_eq!(session.user.full_name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_password_are_rejected() {
        let auth = backend().await;
        auth.sign_up("leo@example.com", "secreto", None).await.unwrap();

        let err = auth.sign_up("LEO@example.com", "otro123", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(ref m) if m == ALREADY_REGISTERED));

        let err = auth.sign_in("leo@example.com", "secretx").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
        let err = auth.sign_in("nadie@example.com", "secreto").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(_)));
    }

    #[tokio::test]
    async fn tokens_resolve_until_sign_out() {
        let auth = backend().await;
        let session = auth.sign_up("eva@example.com", "secreto", None).await.unwrap();
        let token = session.access_token.unwrap();

        let user = auth.current_user(&token).await.unwrap().unwrap();
        assert_eq!(user.id, session.user.id);

        let updated = auth.update_profile(&token, "  Eva Gómez ").await.unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Eva Gómez"));

        auth.sign_out(&token).await.unwrap();
        assert_eq!(auth.current_user(&token).await.unwrap(), None);
        assert!(auth.update_profile(&token, "x").await.is_err());
    }
}
