pub mod auth;
pub mod config;
pub mod db;
mod entities;
pub mod error;
pub mod favorites;
pub mod genres;
pub mod local;
pub mod models;
pub mod pagination;
pub mod providers;
pub mod recommend;
pub mod routes;
pub mod selection;
pub mod session;
pub mod store;
pub mod supabase;
pub mod templates;
pub mod tmdb;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::AuthBackend, config::Config, genres::GenreCatalog, session::SessionRegistry,
    store::PreferenceStore, tmdb::MetadataSource,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub metadata: Arc<dyn MetadataSource>,
    pub genres: Arc<GenreCatalog>,
    pub store: Arc<dyn PreferenceStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        metadata: Arc<dyn MetadataSource>,
        auth: Arc<dyn AuthBackend>,
        store: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            config,
            genres: Arc::new(GenreCatalog::new(metadata.clone())),
            sessions: Arc::new(SessionRegistry::new(auth, metadata.clone())),
            metadata,
            store,
        }
    }
}

/// `/health` sits outside the session layer so probes never open a session.
pub fn router(state: Arc<AppState>) -> Router {
    let pages = Router::new()
        .route("/", get(routes::home))
        .route("/peliculas", get(routes::all_movies))
        .route("/recomendaciones", get(routes::recommendations))
        .route("/login", get(routes::login_page).post(routes::login))
        .route("/registro", get(routes::register_page).post(routes::register))
        .route("/logout", post(routes::logout))
        .route("/perfil", get(routes::profile).post(routes::update_profile))
        .route("/perfil/generos", post(routes::save_genres))
        .route("/perfil/generos/{id}", post(routes::toggle_genre))
        .route("/favoritos/{id}", post(routes::toggle_favorite_movie))
        .route("/valoraciones/{id}", post(routes::rate_movie))
        .route("/pelicula/cerrar", post(routes::close_movie))
        .route("/pelicula/{id}", get(routes::movie_modal))
        .route("/terminos", get(routes::terms))
        .fallback(routes::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), session::session_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(routes::health))
        .merge(pages)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
