use std::{sync::Arc, time::Duration};

use cinedigital::{
    AppState,
    auth::AuthBackend,
    config::{Backend, Config},
    db,
    local::LocalBackend,
    store::PreferenceStore,
    supabase::SupabaseClient,
    tmdb::{MetadataSource, TmdbClient},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinedigital=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinedigital/0.1")
        .timeout(Duration::from_secs(30))
        .build()?;

    let metadata: Arc<dyn MetadataSource> = Arc::new(TmdbClient::new(
        http.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_base_url.clone(),
        config.tmdb_language.clone(),
    ));

    let (auth, store): (Arc<dyn AuthBackend>, Arc<dyn PreferenceStore>) = match config.backend {
        Backend::Supabase => {
            let client = Arc::new(SupabaseClient::new(
                http,
                config.supabase_url.clone(),
                config.supabase_anon_key.clone(),
            ));
            (client.clone(), client)
        },
        Backend::Local => {
            let db = db::connect_and_migrate(&config.database_url).await?;
            let backend = Arc::new(LocalBackend::new(db));
            (backend.clone(), backend)
        },
    };
    tracing::info!(backend = ?config.backend, "preference backend selected");

    let state = Arc::new(AppState::new(config.clone(), metadata, auth, store));
    state.sessions.clone().spawn_sweeper(config.session_idle);
    let app = cinedigital::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
