use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use tokio::{sync::RwLock, task::JoinHandle, time::Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AuthBackend, AuthError, AuthResult, validate_registration},
    favorites::InFlight,
    models::{AuthenticatedUser, Principal, RegistrationForm},
    pagination::ListingPages,
    selection::MovieSelection,
    tmdb::MetadataSource,
};

pub const SESSION_COOKIE: &str = "cd_sid";
pub const TOKEN_COOKIE: &str = "cd_token";

#[derive(Clone, Debug, PartialEq)]
pub enum AuthState {
    Loading,
    Authenticated(AuthenticatedUser),
    Anonymous,
}

struct AuthInner {
    state: AuthState,
    token: Option<String>,
}

/// Signed-in user for one browser session.
///
/// Starts in `Loading`; `initialize` settles it from a stored token. Only
/// the operations below change the state, and a failed operation leaves it
/// as it was.
pub struct AuthProvider {
    backend: Arc<dyn AuthBackend>,
    inner: RwLock<AuthInner>,
}

impl AuthProvider {
    pub fn new(backend: Arc<dyn AuthBackend>) -> Self {
        Self { backend, inner: RwLock::new(AuthInner { state: AuthState::Loading, token: None }) }
    }

    /// Resolves `Loading` by asking the backend who owns `token`. A no-op
    /// once settled. Backend failures settle to `Anonymous`.
    pub async fn initialize(&self, token: Option<&str>) {
        let mut inner = self.inner.write().await;
        if inner.state != AuthState::Loading {
            return;
        }

        let Some(token) = token.filter(|t| !t.is_empty()) else {
            inner.state = AuthState::Anonymous;
            return;
        };

        match self.backend.current_user(token).await {
            Ok(Some(user)) => {
                debug!(user_id = %user.id, "session restored");
                inner.state = AuthState::Authenticated(user);
                inner.token = Some(token.to_string());
            },
            Ok(None) => inner.state = AuthState::Anonymous,
            Err(err) => {
                warn!(error = %err, "could not restore session");
                inner.state = AuthState::Anonymous;
            },
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthenticatedUser> {
        let session = self.backend.sign_in(email, password).await?;
        let mut inner = self.inner.write().await;
        inner.state = AuthState::Authenticated(session.user.clone());
        inner.token = session.access_token;
        Ok(session.user)
    }

    /// Validation failures return before the backend is called.
    pub async fn sign_up(&self, form: &RegistrationForm) -> AuthResult<AuthenticatedUser> {
        validate_registration(form)?;
        let full_name = Some(form.full_name.trim()).filter(|n| !n.is_empty());
        let session = self.backend.sign_up(&form.email, &form.password, full_name).await?;
        let mut inner = self.inner.write().await;
        inner.state = AuthState::Authenticated(session.user.clone());
        inner.token = session.access_token;
        Ok(session.user)
    }

    /// A token the backend no longer accepts still signs the session out;
    /// transport failures do not.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(token) = inner.token.as_deref() {
            match self.backend.sign_out(token).await {
                Ok(()) | Err(AuthError::Rejected(_)) => {},
                Err(err) => return Err(err),
            }
        }
        inner.state = AuthState::Anonymous;
        inner.token = None;
        Ok(())
    }

    pub async fn update_profile(&self, full_name: &str) -> AuthResult<AuthenticatedUser> {
        let mut inner = self.inner.write().await;
        let Some(token) = inner.token.clone() else {
            return Err(AuthError::Rejected("No hay una sesión activa".into()));
        };
        let user = self.backend.update_profile(&token, full_name).await?;
        inner.state = AuthState::Authenticated(user.clone());
        Ok(user)
    }

    pub async fn state(&self) -> AuthState {
        self.inner.read().await.state.clone()
    }

    pub async fn user(&self) -> Option<AuthenticatedUser> {
        match &self.inner.read().await.state {
            AuthState::Authenticated(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub async fn principal(&self) -> Option<Principal> {
        let inner = self.inner.read().await;
        match &inner.state {
            AuthState::Authenticated(user) => {
                Some(Principal { user_id: user.id.clone(), access_token: inner.token.clone() })
            },
            _ => None,
        }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }
}

pub struct UserSession {
    pub id: Uuid,
    pub auth: AuthProvider,
    pub selection: MovieSelection,
    pub in_flight: InFlight,
    pub listings: ListingPages,
    /// Milliseconds since the registry started, as of the last request.
    last_seen: AtomicU64,
}

/// How often the background sweep looks for idle sessions.
const SWEEP_EVERY: Duration = Duration::from_secs(60);

pub struct SessionRegistry {
    auth: Arc<dyn AuthBackend>,
    metadata: Arc<dyn MetadataSource>,
    started: Instant,
    sessions: RwLock<HashMap<Uuid, Arc<UserSession>>>,
}

impl SessionRegistry {
    pub fn new(auth: Arc<dyn AuthBackend>, metadata: Arc<dyn MetadataSource>) -> Self {
        Self { auth, metadata, started: Instant::now(), sessions: RwLock::new(HashMap::new()) }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Looks up the session named by the cookie, creating one when the
    /// cookie is missing, malformed or unknown. The flag is true for a new
    /// session. Either way the session counts as seen now.
    pub async fn resolve(&self, sid: Option<&str>) -> (Arc<UserSession>, bool) {
        let id = sid.and_then(|s| Uuid::parse_str(s).ok());
        let now = self.now_ms();

        if let Some(id) = id {
            if let Some(session) = self.sessions.read().await.get(&id) {
                session.last_seen.store(now, Ordering::Relaxed);
                return (session.clone(), false);
            }
        }

        let session = Arc::new(UserSession {
            id: Uuid::new_v4(),
            auth: AuthProvider::new(self.auth.clone()),
            selection: MovieSelection::new(self.metadata.clone()),
            in_flight: InFlight::default(),
            listings: ListingPages::default(),
            last_seen: AtomicU64::new(now),
        });
        self.sessions.write().await.insert(session.id, session.clone());
        debug!(session_id = %session.id, "session created");
        (session, true)
    }

    /// Drops every session not seen within `max_idle` and returns how many
    /// went. A request already holding one of them keeps its `Arc`.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = self.now_ms();
        let limit = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_sub(s.last_seen.load(Ordering::Relaxed)) < limit);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Runs `evict_idle` on a fixed interval for the life of the process.
    pub fn spawn_sweeper(self: Arc<Self>, max_idle: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_EVERY.min(max_idle));
            loop {
                tick.tick().await;
                let evicted = self.evict_idle(max_idle).await;
                if evicted > 0 {
                    let remaining = self.len().await;
                    info!(evicted, remaining, "idle sessions evicted");
                }
            }
        })
    }
}

pub fn session_cookie(id: Uuid, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn token_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn expired_token_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, "")).path("/").build();
    cookie.make_removal();
    cookie
}

/// Attaches the caller's `UserSession` to the request and settles its auth
/// state before the handler runs.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let sid = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let token = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string());

    let (session, created) = state.sessions.resolve(sid.as_deref()).await;
    session.auth.initialize(token.as_deref()).await;
    let stale_token = token.is_some() && session.auth.access_token().await.is_none();

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    let mut cookies = Vec::new();
    if created {
        cookies.push(session_cookie(session.id, state.config.cookie_secure));
    }
    if stale_token && !response.headers().contains_key(SET_COOKIE) {
        cookies.push(expired_token_cookie());
    }
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::auth::{AuthSession, PASSWORD_TOO_SHORT};

    #[derive(Default)]
    struct FakeAuth {
        calls: AtomicUsize,
    }

    fn user(id: &str) -> AuthenticatedUser {
        AuthenticatedUser { id: id.into(), email: Some(format!("{id}@example.com")), full_name: None }
    }

    #[async_trait::async_trait]
    impl AuthBackend for FakeAuth {
        async fn sign_up(&self, _: &str, _: &str, name: Option<&str>) -> AuthResult<AuthSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut u = user("new");
            u.full_name = name.map(str::to_string);
            Ok(AuthSession { user: u, access_token: Some("tok-new".into()) })
        }

        async fn sign_in(&self, _: &str, password: &str) -> AuthResult<AuthSession> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if password == "secreto" {
                Ok(AuthSession { user: user("u1"), access_token: Some("tok-u1".into()) })
            } else {
                Err(AuthError::Rejected("Invalid login credentials".into()))
            }
        }

        async fn sign_out(&self, _: &str) -> AuthResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn current_user(&self, token: &str) -> AuthResult<Option<AuthenticatedUser>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((token == "tok-u1").then(|| user("u1")))
        }

        async fn update_profile(&self, _: &str, full_name: &str) -> AuthResult<AuthenticatedUser> {
            let mut u = user("u1");
            u.full_name = Some(full_name.into());
            Ok(u)
        }
    }

    #[tokio::test]
    async fn initialize_settles_loading_once() {
        let backend = Arc::new(FakeAuth::default());
        let auth = AuthProvider::new(backend.clone());
        assert_eq!(auth.state().await, AuthState::Loading);

        auth.initialize(Some("tok-u1")).await;
        assert_eq!(auth.state().await, AuthState::Authenticated(user("u1")));
        auth.initialize(Some("other")).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let anon = AuthProvider::new(backend.clone());
        anon.initialize(Some("expired")).await;
        assert_eq!(anon.state().await, AuthState::Anonymous);

        let fresh = AuthProvider::new(backend.clone());
        fresh.initialize(None).await;
        assert_eq!(fresh.state().await, AuthState::Anonymous);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_sign_in_leaves_state_unchanged() {
        let auth = AuthProvider::new(Arc::new(FakeAuth::default()));
        auth.initialize(None).await;

        assert!(auth.sign_in("u1@example.com", "wrong").await.is_err());
        assert_eq!(auth.state().await, AuthState::Anonymous);

        auth.sign_in("u1@example.com", "secreto").await.unwrap();
        let principal = auth.principal().await.unwrap();
        assert_eq!(principal.user_id, "u1");
        assert_eq!(principal.access_token.as_deref(), Some("tok-u1"));

        auth.sign_out().await.unwrap();
        assert_eq!(auth.state().await, AuthState::Anonymous);
        assert_eq!(auth.principal().await, None);
    }

    #[tokio::test]
    async fn short_password_never_reaches_backend() {
        let backend = Arc::new(FakeAuth::default());
        let auth = AuthProvider::new(backend.clone());
        auth.initialize(None).await;

        let form = RegistrationForm {
            full_name: "Ana".into(),
            email: "ana@example.com".into(),
            password: "abc12".into(),
            confirm_password: "abc12".into(),
        };
        let err = auth.sign_up(&form).await.unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_TOO_SHORT);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(auth.state().await, AuthState::Anonymous);

        let form = RegistrationForm { password: "abc123".into(), confirm_password: "abc123".into(), ..form };
        let created = auth.sign_up(&form).await.unwrap();
        assert_eq!(created.full_name.as_deref(), Some("Ana"));
        assert!(matches!(auth.state().await, AuthState::Authenticated(_)));
    }

    #[tokio::test]
    async fn profile_update_requires_a_token() {
        let auth = AuthProvider::new(Arc::new(FakeAuth::default()));
        auth.initialize(None).await;
        assert!(auth.update_profile("Ana").await.is_err());

        auth.sign_in("u1@example.com", "secreto").await.unwrap();
        let updated = auth.update_profile("Ana").await.unwrap();
        assert_eq!(auth.user().await.unwrap().full_name, updated.full_name);
    }

    fn registry() -> SessionRegistry {
        let metadata = crate::tmdb::TmdbClient::new(
            reqwest::Client::new(),
            "key".into(),
            "http://127.0.0.1:9".into(),
            "es-ES".into(),
        );
        SessionRegistry::new(Arc::new(FakeAuth::default()), Arc::new(metadata))
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let sessions = registry();
        let (kept, _) = sessions.resolve(None).await;
        let (idle, _) = sessions.resolve(None).await;
        sessions.resolve(Some("not-a-uuid")).await;
        assert_eq!(sessions.len().await, 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let (again, created) = sessions.resolve(Some(&kept.id.to_string())).await;
        assert!(!created);
        assert_eq!(again.id, kept.id);

        assert_eq!(sessions.evict_idle(Duration::from_millis(40)).await, 2);
        assert_eq!(sessions.len().await, 1);

        let (fresh, created) = sessions.resolve(Some(&idle.id.to_string())).await;
        assert!(created);
        assert_ne!(fresh.id, idle.id);
        assert_eq!(sessions.evict_idle(Duration::from_secs(60)).await, 0);
        assert_eq!(sessions.len().await, 2);
    }

    #[test]
    fn removal_cookie_expires_token() {
        let cookie = expired_token_cookie();
        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some());
    }
}
