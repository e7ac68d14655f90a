use std::sync::Arc;

use axum::{
    Extension,
    extract::{Form, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{
    AppState,
    auth::AuthError,
    error::AppResult,
    favorites::{FavoriteList, ToggleOutcome, toggle_favorite},
    genres,
    models::{
        Genre, ListKind, LoginForm, Movie, Paged, Principal, ProfileForm, RegistrationForm,
        TimeWindow,
    },
    pagination::Pager,
    providers, recommend,
    selection::SelectOutcome,
    session::{UserSession, expired_token_cookie, token_cookie},
    templates::{self, HomeView, ListingView, ModalView, Notice, ProfileView},
};

const LISTING_FAILED: &str = "No se pudieron cargar las películas. Inténtalo de nuevo más tarde.";
const DETAILS_FAILED: &str = "No se pudieron cargar los detalles de la película.";

type Session = Extension<Arc<UserSession>>;

/// Only site-relative targets are followed after a form post.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

fn redirect_next(next: Option<&str>, default: &str) -> Redirect {
    Redirect::to(safe_next(next).unwrap_or(default))
}

fn login_redirect(next: &str) -> Response {
    Redirect::to(&format!("/login?next={}", urlencoding::encode(next))).into_response()
}

/// Replaces `#modal` on the page with `body`.
fn modal_fragment(body: String) -> Response {
    let mut resp = Html(body).into_response();
    resp.headers_mut().insert("datastar-selector", HeaderValue::from_static("#modal"));
    resp.headers_mut().insert("datastar-mode", HeaderValue::from_static("outer"));
    resp
}

/// Spanish text for an auth failure shown on a form.
fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::Validation(msg) => msg.to_string(),
        AuthError::Rejected(msg) => match msg.as_str() {
            "Invalid login credentials" => "Correo o contraseña incorrectos".to_string(),
            "User already registered" => "Ya existe una cuenta con ese correo".to_string(),
            "Email not confirmed" => "Confirma tu correo antes de iniciar sesión".to_string(),
            _ => msg.clone(),
        },
        _ => "No se pudo completar la operación. Inténtalo de nuevo.".to_string(),
    }
}

async fn favorite_ids(state: &AppState, who: Option<&Principal>) -> Vec<i64> {
    let Some(who) = who else {
        return Vec::new();
    };
    match FavoriteList::load(&*state.store, who).await {
        Ok(list) => list.movie_ids(),
        Err(err) => {
            warn!(error = %err, "could not load favorites");
            Vec::new()
        },
    }
}

async fn genre_list(state: &AppState) -> Vec<Genre> {
    match state.genres.all().await {
        Ok(genres) => genres.to_vec(),
        Err(err) => {
            warn!(error = %err, "could not load genre catalog");
            Vec::new()
        },
    }
}

async fn listing_or_error(
    fetch: impl Future<Output = AppResult<Paged<Movie>>>,
) -> (Paged<Movie>, Option<&'static str>) {
    match fetch.await {
        Ok(page) => (page, None),
        Err(err) => {
            warn!(error = %err, "listing request failed");
            (Paged::empty(), Some(LISTING_FAILED))
        },
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    tab: Option<ListKind>,
    q: Option<String>,
    genre: Option<i64>,
    year: Option<i16>,
    #[serde(rename = "movieId")]
    movie_id: Option<i64>,
}

impl HomeQuery {
    fn search(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or("")
    }

    /// The same page with the modal closed.
    fn back(&self) -> String {
        let mut params = Vec::new();
        if let Some(tab) = self.tab {
            params.push(format!("tab={}", tab.as_str()));
        }
        if !self.search().is_empty() {
            params.push(format!("q={}", urlencoding::encode(self.search())));
        }
        if let Some(genre) = self.genre {
            params.push(format!("genre={genre}"));
        }
        if let Some(year) = self.year {
            params.push(format!("year={year}"));
        }
        if params.is_empty() { "/".to_string() } else { format!("/?{}", params.join("&")) }
    }
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Query(q): Query<HomeQuery>,
) -> AppResult<Html<String>> {
    let user = session.auth.user().await;
    let principal = session.auth.principal().await;
    let tab = q.tab.unwrap_or_default();
    let search = q.search();

    let listing = async {
        if !search.is_empty() {
            state.metadata.search(search, 1).await
        } else if let Some(genre_id) = q.genre {
            state.metadata.discover_by_genre(genre_id, 1).await
        } else if let Some(year) = q.year {
            state.metadata.discover_by_year(year, 1).await
        } else {
            match tab {
                ListKind::Popular => state.metadata.popular(1).await,
                ListKind::Trending => state.metadata.trending(TimeWindow::Week, 1).await,
            }
        }
    };

    let recommendations = async {
        match recommend::for_user(&*state.metadata, &*state.store, principal.as_ref()).await {
            Ok(recs) => recs.map(|r| r.movies),
            Err(err) => {
                warn!(error = %err, "recommendations unavailable");
                None
            },
        }
    };

    let favorite_genres = async {
        let who = principal.as_ref()?;
        let set = match state.store.get_favorite_genres(who).await {
            Ok(set) => set,
            Err(err) => {
                warn!(error = %err, "could not load favorite genres");
                return Some(Vec::new());
            },
        };
        Some(state.genres.resolve(&set.genre_ids).await.unwrap_or_default())
    };

    let ((page, error), genres, favorites, recommended, favorite_genres) = futures::join!(
        listing_or_error(listing),
        genre_list(&state),
        favorite_ids(&state, principal.as_ref()),
        recommendations,
        favorite_genres,
    );

    let back = q.back();
    Ok(Html(templates::home_page(&HomeView {
        user: user.as_ref(),
        tab,
        query: search,
        genre: q.genre,
        genres: &genres,
        movies: &page.results,
        favorite_ids: &favorites,
        recommendations: recommended.as_deref(),
        favorite_genres: favorite_genres.as_deref(),
        error,
        open_movie: q.movie_id,
        back: &back,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "type")]
    kind: Option<ListKind>,
    page: Option<i64>,
    #[serde(rename = "movieId")]
    movie_id: Option<i64>,
}

fn listing_url(kind: ListKind, page: u32, movie_id: Option<i64>) -> String {
    let url = format!("/peliculas?type={}&page={page}", kind.as_str());
    match movie_id {
        Some(id) => templates::with_movie(&url, id),
        None => url,
    }
}

/// Pages past the last one this session has seen are refused before the
/// provider is asked; the browser is sent back to the page it was on.
pub async fn all_movies(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Query(q): Query<ListingQuery>,
) -> AppResult<Response> {
    let user = session.auth.user().await;
    let principal = session.auth.principal().await;
    let kind = q.kind.unwrap_or_default();

    let known = session.listings.get(kind).await;
    let mut requested = known;
    requested.go_to(1);
    if let Some(page) = q.page {
        if !requested.go_to(page) {
            debug!(page, total = known.total(), "ignoring out-of-range page");
            return Ok(
                Redirect::to(&listing_url(kind, known.current(), q.movie_id)).into_response()
            );
        }
    }
    let page_number = requested.current();

    let listing = async {
        match kind {
            ListKind::Popular => state.metadata.popular(page_number).await,
            ListKind::Trending => state.metadata.trending(TimeWindow::Week, page_number).await,
        }
    };
    let ((page, error), favorites) =
        futures::join!(listing_or_error(listing), favorite_ids(&state, principal.as_ref()));

    let pager = Pager::new(page_number, page.total_pages);
    if error.is_none() {
        session.listings.set(kind, pager).await;
        if pager.current() != page_number {
            debug!(page = page_number, total = pager.total(), "page past the end of the listing");
            return Ok(
                Redirect::to(&listing_url(kind, pager.current(), q.movie_id)).into_response()
            );
        }
    }

    let back = listing_url(kind, page_number, None);
    Ok(Html(templates::all_movies_page(&ListingView {
        user: user.as_ref(),
        kind,
        movies: &page.results,
        favorite_ids: &favorites,
        pager,
        error,
        open_movie: q.movie_id,
        back: &back,
    }))
    .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenMovieQuery {
    #[serde(rename = "movieId")]
    movie_id: Option<i64>,
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Query(q): Query<OpenMovieQuery>,
) -> AppResult<Response> {
    let Some(principal) = session.auth.principal().await else {
        return Ok(login_redirect("/recomendaciones"));
    };
    let user = session.auth.user().await;

    let Some(recs) = recommend::for_user(&*state.metadata, &*state.store, Some(&principal)).await?
    else {
        return Ok(Redirect::to("/").into_response());
    };
    let favorites = favorite_ids(&state, Some(&principal)).await;

    Ok(Html(templates::recommendations_page(user.as_ref(), &recs.movies, &favorites, q.movie_id))
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

pub async fn login_page(Extension(session): Session, Query(q): Query<NextQuery>) -> Response {
    if session.auth.user().await.is_some() {
        return redirect_next(q.next.as_deref(), "/").into_response();
    }
    Html(templates::login_page(None, "", safe_next(q.next.as_deref()))).into_response()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let next = safe_next(form.next.as_deref());
    match session.auth.sign_in(form.email.trim(), &form.password).await {
        Ok(user) => {
            info!(user_id = %user.id, "signed in");
            let jar = match session.auth.access_token().await {
                Some(token) => jar.add(token_cookie(token, state.config.cookie_secure)),
                None => jar,
            };
            (jar, redirect_next(next, "/")).into_response()
        },
        Err(err) => {
            warn!(error = %err, "sign-in failed");
            Html(templates::login_page(Some(&auth_message(&err)), form.email.trim(), next))
                .into_response()
        },
    }
}

pub async fn register_page(Extension(session): Session) -> Response {
    if session.auth.user().await.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(templates::register_page(None, &RegistrationForm::default())).into_response()
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    jar: CookieJar,
    Form(form): Form<RegistrationForm>,
) -> Response {
    match session.auth.sign_up(&form).await {
        Ok(user) => {
            info!(user_id = %user.id, "signed up");
            let jar = match session.auth.access_token().await {
                Some(token) => jar.add(token_cookie(token, state.config.cookie_secure)),
                None => jar,
            };
            (jar, Redirect::to("/")).into_response()
        },
        Err(err) => {
            warn!(error = %err, "sign-up failed");
            Html(templates::register_page(Some(&auth_message(&err)), &form)).into_response()
        },
    }
}

pub async fn logout(Extension(session): Session, jar: CookieJar) -> AppResult<Response> {
    session.auth.sign_out().await?;
    session.selection.close().await;
    Ok((jar.add(expired_token_cookie()), Redirect::to("/")).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileQuery {
    notice: Option<String>,
    #[serde(rename = "movieId")]
    movie_id: Option<i64>,
}

fn profile_notice(code: Option<&str>) -> Option<Notice<'static>> {
    match code? {
        "perfil" => Some(Notice::Success("Perfil actualizado")),
        "generos" => Some(Notice::Success("Géneros favoritos guardados")),
        "error-perfil" => Some(Notice::Error("Error al actualizar el perfil")),
        "error-generos" => Some(Notice::Error("Error al guardar géneros favoritos")),
        _ => None,
    }
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Query(q): Query<ProfileQuery>,
) -> AppResult<Response> {
    let (Some(user), Some(principal)) = (session.auth.user().await, session.auth.principal().await)
    else {
        return Ok(login_redirect("/perfil"));
    };

    let (favorites, genre_set, genres) = futures::join!(
        FavoriteList::load(&*state.store, &principal),
        state.store.get_favorite_genres(&principal),
        genre_list(&state),
    );
    let favorites: Vec<Movie> = favorites?.movies().cloned().collect();
    let genre_set = genre_set?;

    Ok(Html(templates::profile_page(&ProfileView {
        user: &user,
        favorites: &favorites,
        genres: &genres,
        favorite_genre_ids: &genre_set.genre_ids,
        notice: profile_notice(q.notice.as_deref()),
        open_movie: q.movie_id,
        back: "/perfil",
    }))
    .into_response())
}

pub async fn update_profile(Extension(session): Session, Form(form): Form<ProfileForm>) -> Response {
    if session.auth.user().await.is_none() {
        return login_redirect("/perfil");
    }
    match session.auth.update_profile(form.full_name.trim()).await {
        Ok(_) => Redirect::to("/perfil?notice=perfil").into_response(),
        Err(err) => {
            warn!(error = %err, "profile update failed");
            Redirect::to("/perfil?notice=error-perfil").into_response()
        },
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenresForm {
    #[serde(default)]
    genre: Vec<i64>,
}

/// Checkbox form; repeated `genre` fields need the html-form flavored extractor.
pub async fn save_genres(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    axum_extra::extract::Form(form): axum_extra::extract::Form<GenresForm>,
) -> Response {
    let Some(principal) = session.auth.principal().await else {
        return login_redirect("/perfil");
    };
    let ids = genres::normalize(&form.genre);
    match state.store.save_favorite_genres(&principal, &ids).await {
        Ok(()) => {
            info!(user_id = %principal.user_id, count = ids.len(), "favorite genres saved");
            Redirect::to("/perfil?notice=generos").into_response()
        },
        Err(err) => {
            warn!(error = %err, "saving favorite genres failed");
            Redirect::to("/perfil?notice=error-generos").into_response()
        },
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NextForm {
    next: Option<String>,
}

pub async fn toggle_genre(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Path(genre_id): Path<i64>,
    Form(form): Form<NextForm>,
) -> AppResult<Response> {
    let Some(principal) = session.auth.principal().await else {
        return Ok(login_redirect("/perfil"));
    };
    let current = state.store.get_favorite_genres(&principal).await?;
    let ids = genres::toggle(&current.genre_ids, genre_id);
    state.store.save_favorite_genres(&principal, &ids).await?;
    debug!(genre_id, count = ids.len(), "favorite genre toggled");
    Ok(redirect_next(form.next.as_deref(), "/perfil").into_response())
}

/// Hidden fields a movie card posts with its heart; the modal posts only
/// `next`.
#[derive(Debug, Default, Deserialize)]
pub struct FavoriteForm {
    next: Option<String>,
    title: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre: Vec<i64>,
}

impl FavoriteForm {
    fn card_snapshot(&self, movie_id: i64) -> Option<Movie> {
        let title = self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        Some(Movie {
            id: movie_id,
            title: title.to_string(),
            overview: String::new(),
            poster_path: self.poster_path.clone().filter(|p| !p.is_empty()),
            backdrop_path: None,
            release_date: self.release_date.clone().filter(|d| !d.is_empty()),
            vote_average: self.vote_average.unwrap_or_default(),
            vote_count: 0,
            popularity: 0.0,
            genre_ids: self.genre.clone(),
        })
    }
}

pub async fn toggle_favorite_movie(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Path(movie_id): Path<i64>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<FavoriteForm>,
) -> AppResult<Response> {
    let fallback = templates::with_movie("/", movie_id);
    let Some(principal) = session.auth.principal().await else {
        return Ok(login_redirect(safe_next(form.next.as_deref()).unwrap_or(&fallback)));
    };

    let snapshot = match (form.card_snapshot(movie_id), session.selection.current(movie_id).await) {
        (Some(movie), _) => movie,
        (None, Some(details)) => Movie::from(&details),
        (None, None) => Movie::from(&state.metadata.movie_details(movie_id).await?),
    };

    match toggle_favorite(&*state.store, &session.in_flight, &principal, &snapshot).await? {
        ToggleOutcome::Busy => debug!(movie_id, "favorite toggle already running"),
        outcome => debug!(movie_id, ?outcome, "favorite toggled"),
    }
    Ok(redirect_next(form.next.as_deref(), &fallback).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RatingForm {
    rating: u8,
    next: Option<String>,
}

pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Path(movie_id): Path<i64>,
    Form(form): Form<RatingForm>,
) -> AppResult<Response> {
    let fallback = templates::with_movie("/", movie_id);
    let Some(principal) = session.auth.principal().await else {
        return Ok(login_redirect(safe_next(form.next.as_deref()).unwrap_or(&fallback)));
    };
    state.store.upsert_rating(&principal, movie_id, form.rating).await?;
    info!(user_id = %principal.user_id, movie_id, rating = form.rating, "movie rated");
    Ok(redirect_next(form.next.as_deref(), &fallback).into_response())
}

/// The detail modal for `movie_id`, swapped into the page by Datastar.
pub async fn movie_modal(
    State(state): State<Arc<AppState>>,
    Extension(session): Session,
    Path(movie_id): Path<i64>,
    Query(q): Query<NextQuery>,
) -> Response {
    let back = safe_next(q.next.as_deref()).unwrap_or("/");

    let details = match session.selection.select(movie_id).await {
        SelectOutcome::Loaded(details) => details,
        SelectOutcome::Failed(_) => return modal_fragment(templates::modal_error(DETAILS_FAILED, back)),
        SelectOutcome::Stale => return StatusCode::NO_CONTENT.into_response(),
    };

    let principal = session.auth.principal().await;
    let favorite = async {
        let who = principal.as_ref()?;
        match FavoriteList::load(&*state.store, who).await {
            Ok(list) => Some(list.contains(movie_id)),
            Err(err) => {
                warn!(error = %err, "could not load favorites");
                None
            },
        }
    };
    let rating = async {
        let who = principal.as_ref()?;
        state.store.get_rating(who, movie_id).await.unwrap_or_else(|err| {
            warn!(error = %err, "could not load rating");
            None
        })
    };

    let (regions, similar, favorite, rating) = futures::join!(
        state.metadata.watch_providers(movie_id),
        state.metadata.similar(movie_id),
        favorite,
        rating,
    );

    let providers = match regions {
        Ok(regions) => providers::resolve(
            &regions,
            &state.config.watch_region,
            &state.config.watch_fallback_region,
            &details.movie.title,
        ),
        Err(err) => {
            warn!(movie_id, error = %err, "watch providers unavailable");
            Vec::new()
        },
    };
    let similar = similar.map(|p| p.results).unwrap_or_default();

    modal_fragment(templates::movie_modal(&ModalView {
        details: &details,
        providers: &providers,
        similar: &similar,
        favorite,
        rating,
        back,
    }))
}

pub async fn close_movie(Extension(session): Session, Form(form): Form<NextForm>) -> Response {
    session.selection.close().await;
    redirect_next(form.next.as_deref(), "/").into_response()
}

pub async fn terms(Extension(session): Session) -> Html<String> {
    Html(templates::terms_page(session.auth.user().await.as_ref()))
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn fallback() -> Redirect {
    Redirect::to("/")
}
