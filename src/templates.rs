use maud::{DOCTYPE, Markup, PreEscaped, html};

use crate::{
    models::{
        AuthenticatedUser, Genre, ListKind, Movie, MovieDetails, ProviderType, RegistrationForm,
        WatchProvider,
    },
    pagination::{PageLink, Pager},
    recommend::WIDGET_SIZE,
    tmdb::{BackdropSize, PosterSize, backdrop_url, poster_url},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const DATASTAR_CDN: &str =
    "https://cdn.jsdelivr.net/npm/@sudodevnull/datastar@0.19.9/dist/datastar.js";

const SITE_NAME: &str = "CineDigital";
const CONTACT_EMAIL: &str = "contacto@tucinedigital.com";

const MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

pub enum Notice<'a> {
    Success(&'a str),
    Error(&'a str),
}

pub struct HomeView<'a> {
    pub user: Option<&'a AuthenticatedUser>,
    pub tab: ListKind,
    pub query: &'a str,
    pub genre: Option<i64>,
    pub genres: &'a [Genre],
    pub movies: &'a [Movie],
    pub favorite_ids: &'a [i64],
    /// `None` hides the widget.
    pub recommendations: Option<&'a [Movie]>,
    /// `None` for anonymous visitors.
    pub favorite_genres: Option<&'a [Genre]>,
    pub error: Option<&'a str>,
    pub open_movie: Option<i64>,
    pub back: &'a str,
}

pub struct ListingView<'a> {
    pub user: Option<&'a AuthenticatedUser>,
    pub kind: ListKind,
    pub movies: &'a [Movie],
    pub favorite_ids: &'a [i64],
    pub pager: Pager,
    pub error: Option<&'a str>,
    pub open_movie: Option<i64>,
    pub back: &'a str,
}

pub struct ProfileView<'a> {
    pub user: &'a AuthenticatedUser,
    pub favorites: &'a [Movie],
    pub genres: &'a [Genre],
    pub favorite_genre_ids: &'a [i64],
    pub notice: Option<Notice<'a>>,
    pub open_movie: Option<i64>,
    pub back: &'a str,
}

pub struct ModalView<'a> {
    pub details: &'a MovieDetails,
    pub providers: &'a [WatchProvider],
    pub similar: &'a [Movie],
    /// `None` when nobody is signed in.
    pub favorite: Option<bool>,
    pub rating: Option<u8>,
    pub back: &'a str,
}

pub fn home_page(view: &HomeView<'_>) -> String {
    let tab_href = |kind: ListKind| format!("/?tab={}", kind.as_str());
    let genre_href = |id: i64| format!("/?genre={id}");

    page(
        "Inicio",
        view.user,
        html! {
            div class="max-w-7xl mx-auto px-4 py-8 space-y-10" {
                section class="text-center" {
                    h1 class="text-4xl font-bold bg-gradient-to-r from-blue-400 to-purple-600 bg-clip-text text-transparent" { "Descubre tu próxima película" }
                    form class="mt-6 flex max-w-xl mx-auto gap-2" method="get" action="/" {
                        input class="flex-1 rounded-md bg-gray-800 border border-gray-700 px-4 py-2 text-white" type="search" name="q" value=(view.query) placeholder="Buscar películas...";
                        button class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Buscar" }
                    }
                }

                @if let Some(movies) = view.recommendations {
                    (recommended_widget(movies, view.back))
                }

                @if let Some(genres) = view.favorite_genres {
                    (favorite_genres_list(genres, view.back))
                }

                section {
                    div class="flex flex-wrap items-center gap-3 mb-4" {
                        @for kind in [ListKind::Popular, ListKind::Trending] {
                            @let active = view.query.is_empty() && view.genre.is_none() && view.tab == kind;
                            a class=(pill_class(active)) href=(tab_href(kind)) { (list_label(kind)) }
                        }
                    }
                    div class="flex flex-wrap gap-2 mb-6" {
                        a class=(pill_class(view.genre.is_none())) href="/" { "Todos" }
                        @for genre in view.genres {
                            a class=(pill_class(view.genre == Some(genre.id))) href=(genre_href(genre.id)) { (genre.name) }
                        }
                    }
                    @if let Some(error) = view.error {
                        (error_box(error))
                    }
                    (movie_grid(view.movies, view.favorite_ids, view.back))
                }
            }
            (modal_slot(view.open_movie, view.back))
        },
    )
}

pub fn all_movies_page(view: &ListingView<'_>) -> String {
    let href = |kind: ListKind, page: u32| format!("/peliculas?type={}&page={page}", kind.as_str());

    page(
        "Todas las películas",
        view.user,
        html! {
            div class="max-w-7xl mx-auto px-4 py-8" {
                h1 class="text-3xl font-bold text-white mb-6" {
                    @match view.kind {
                        ListKind::Popular => "Películas populares",
                        ListKind::Trending => "Películas en tendencia",
                    }
                }
                div class="flex gap-3 mb-6" {
                    @for kind in [ListKind::Popular, ListKind::Trending] {
                        a class=(pill_class(view.kind == kind)) href=(href(kind, 1)) { (list_label(kind)) }
                    }
                }
                @if let Some(error) = view.error {
                    (error_box(error))
                }
                (movie_grid(view.movies, view.favorite_ids, view.back))

                @if view.pager.total() > 1 {
                    nav class="mt-8 flex flex-wrap items-center justify-center gap-2" aria-label="Paginación" {
                        @match view.pager.prev() {
                            Some(p) => a class=(page_button(false)) href=(href(view.kind, p)) { "Anterior" },
                            None => span class="px-3 py-2 rounded-md text-gray-600" { "Anterior" },
                        }
                        @for link in view.pager.links() {
                            @match link {
                                PageLink::Page { number, current } => a class=(page_button(current)) href=(href(view.kind, number)) aria-current=[current.then_some("page")] { (number) },
                                PageLink::Gap => span class="text-white" { "..." },
                            }
                        }
                        @match view.pager.next() {
                            Some(p) => a class=(page_button(false)) href=(href(view.kind, p)) { "Siguiente" },
                            None => span class="px-3 py-2 rounded-md text-gray-600" { "Siguiente" },
                        }
                    }
                }
            }
            (modal_slot(view.open_movie, view.back))
        },
    )
}

pub fn recommendations_page(
    user: Option<&AuthenticatedUser>,
    movies: &[Movie],
    favorite_ids: &[i64],
    open_movie: Option<i64>,
) -> String {
    let back = "/recomendaciones";
    page(
        "Recomendaciones",
        user,
        html! {
            div class="max-w-7xl mx-auto px-4 py-8" {
                a class="mb-6 inline-block rounded-md bg-black/30 px-4 py-2 text-white hover:bg-black/50" href="/" { "← Volver al inicio" }
                div class="rounded-xl bg-black/30 p-6 shadow-lg" {
                    h1 class="text-3xl font-bold text-white" { "Todas las recomendaciones para ti" }
                    p class="mt-1 mb-6 text-gray-300" { "Películas personalizadas basadas en tus géneros favoritos" }
                    (movie_grid(movies, favorite_ids, back))
                }
            }
            (modal_slot(open_movie, back))
        },
    )
}

pub fn login_page(error: Option<&str>, email: &str, next: Option<&str>) -> String {
    page(
        "Iniciar Sesión",
        None,
        auth_card(
            "Iniciar Sesión",
            html! {
                @if let Some(error) = error {
                    (error_box(error))
                }
                form class="space-y-4" method="post" action="/login" {
                    @if let Some(next) = next {
                        input type="hidden" name="next" value=(next);
                    }
                    (text_input("email", "Correo electrónico", "email", email, true))
                    (text_input("password", "Contraseña", "password", "", true))
                    button class="w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Iniciar Sesión" }
                }
                p class="mt-6 text-center text-sm text-gray-400" {
                    "¿No tienes cuenta? "
                    a class="text-blue-400 hover:text-blue-300" href="/registro" { "Crear Cuenta" }
                }
            },
        ),
    )
}

pub fn register_page(error: Option<&str>, form: &RegistrationForm) -> String {
    page(
        "Crear Cuenta",
        None,
        auth_card(
            "Crear Cuenta",
            html! {
                @if let Some(error) = error {
                    (error_box(error))
                }
                form class="space-y-4" method="post" action="/registro" {
                    (text_input("full_name", "Nombre completo", "text", &form.full_name, false))
                    (text_input("email", "Correo electrónico", "email", &form.email, true))
                    (text_input("password", "Contraseña", "password", "", true))
                    (text_input("confirm_password", "Confirmar contraseña", "password", "", true))
                    p class="text-xs text-gray-400" {
                        "Al registrarte aceptas los "
                        a class="text-blue-400 hover:text-blue-300" href="/terminos" { "Términos y Condiciones" }
                        "."
                    }
                    button class="w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Crear Cuenta" }
                }
                p class="mt-6 text-center text-sm text-gray-400" {
                    "¿Ya tienes cuenta? "
                    a class="text-blue-400 hover:text-blue-300" href="/login" { "Iniciar Sesión" }
                }
            },
        ),
    )
}

pub fn profile_page(view: &ProfileView<'_>) -> String {
    let favorite_ids: Vec<i64> = view.favorites.iter().map(|m| m.id).collect();

    page(
        "Perfil",
        Some(view.user),
        html! {
            div class="max-w-5xl mx-auto px-4 py-8 space-y-8" {
                h1 class="text-3xl font-bold text-white" { "Mi perfil" }

                @match &view.notice {
                    Some(Notice::Success(msg)) => div class="rounded-lg border border-green-700 bg-green-900/40 p-4 text-green-200" { (msg) },
                    Some(Notice::Error(msg)) => {
                        (error_box(msg))
                    },
                    None => {},
                }

                section class="rounded-xl bg-gray-900 p-6 shadow-lg" {
                    h2 class="text-xl font-semibold text-white mb-4" { "Información personal" }
                    form class="space-y-4" method="post" action="/perfil" {
                        div {
                            label class="block text-sm text-gray-300" for="email" { "Correo electrónico" }
                            input class="mt-1 w-full rounded-md bg-gray-800 border border-gray-700 px-3 py-2 text-gray-400" id="email" value=(view.user.email.as_deref().unwrap_or("")) disabled;
                            p class="mt-1 text-xs text-gray-500" { "El correo electrónico no se puede cambiar" }
                        }
                        (text_input("full_name", "Nombre completo", "text", view.user.full_name.as_deref().unwrap_or(""), false))
                        button class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Guardar cambios" }
                    }
                }

                section class="rounded-xl bg-gray-900 p-6 shadow-lg" {
                    h2 class="text-2xl font-semibold bg-gradient-to-r from-blue-400 to-purple-600 bg-clip-text text-transparent" { "Tus Géneros Favoritos" }
                    p class="mt-1 mb-4 text-gray-400" { "Selecciona los géneros que más te gustan para recibir recomendaciones personalizadas" }
                    form method="post" action="/perfil/generos" {
                        div class="flex flex-wrap gap-3 mb-6" {
                            @for genre in view.genres {
                                @let checked = view.favorite_genre_ids.contains(&genre.id);
                                label class=(pill_class(checked)) {
                                    input class="mr-1 accent-purple-500" type="checkbox" name="genre" value=(genre.id) checked[checked];
                                    (genre.name)
                                }
                            }
                        }
                        button class="rounded-md bg-gradient-to-r from-blue-500 to-purple-600 px-4 py-2 font-semibold text-white" type="submit" { "Guardar géneros" }
                    }
                }

                section {
                    h2 class="text-2xl font-semibold text-white mb-4" { "Tus películas favoritas" }
                    @if view.favorites.is_empty() {
                        div class="rounded-xl bg-gray-900 p-8 text-center" {
                            p class="text-gray-300" { "No tienes películas favoritas" }
                            a class="mt-2 inline-block text-blue-400 hover:text-blue-300" href="/" { "Explorar películas" }
                        }
                    } @else {
                        (movie_grid(view.favorites, &favorite_ids, view.back))
                    }
                }
            }
            (modal_slot(view.open_movie, view.back))
        },
    )
}

pub fn terms_page(user: Option<&AuthenticatedUser>) -> String {
    let sections: [(&str, &str); 8] = [
        (
            "1. Aceptación de los Términos",
            "Al acceder y utilizar este sitio aceptas quedar vinculado por estos términos. Si no estás de acuerdo con alguna parte, no utilices el servicio.",
        ),
        (
            "2. Descripción del Servicio",
            "El servicio permite descubrir películas, consultar su información y guardar favoritos y preferencias. Los datos de películas proceden de The Movie Database (TMDB).",
        ),
        (
            "3. Cuentas de Usuario",
            "Eres responsable de mantener la confidencialidad de tu cuenta y contraseña, y de toda la actividad que ocurra bajo tu cuenta.",
        ),
        (
            "4. Propiedad Intelectual",
            "Los carteles, imágenes y descripciones pertenecen a sus respectivos titulares. Este producto usa la API de TMDB pero no está respaldado ni certificado por TMDB.",
        ),
        (
            "5. Privacidad",
            "Solo almacenamos los datos necesarios para tu cuenta: correo electrónico, nombre, películas favoritas, valoraciones y géneros favoritos.",
        ),
        (
            "6. Limitación de Responsabilidad",
            "El servicio se ofrece tal cual. No garantizamos la exactitud de la información de las películas ni la disponibilidad de las plataformas de streaming enlazadas.",
        ),
        ("7. Ley Aplicable", "Estos términos se rigen por la legislación española."),
        ("8. Contacto", "Para cualquier consulta sobre estos términos puedes escribirnos a:"),
    ];

    page(
        "Términos y Condiciones",
        user,
        html! {
            div class="max-w-3xl mx-auto px-4 py-10" {
                h1 class="text-3xl font-bold mb-8 bg-gradient-to-r from-blue-400 to-purple-600 bg-clip-text text-transparent inline-block" { "Términos y Condiciones" }
                div class="space-y-8" {
                    @for (title, body) in sections {
                        section {
                            h2 class="text-xl font-semibold mb-3 text-blue-400" { (title) }
                            p class="text-gray-300" { (body) }
                        }
                    }
                    a class="text-blue-400 hover:text-blue-300" href=(format!("mailto:{CONTACT_EMAIL}")) { (CONTACT_EMAIL) }
                }
            }
        },
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Error",
        None,
        html! {
            div class="min-h-[60vh] flex items-center justify-center" {
                div class="max-w-xl w-full px-6" {
                    div class="rounded-lg bg-gray-900 p-8 shadow" {
                        h1 class="text-2xl font-bold text-white" { "Error" }
                        p class="mt-4 text-gray-300" { (message) }
                        a class="mt-6 inline-block text-blue-400 hover:text-blue-300" href="/" { "Volver al inicio" }
                    }
                }
            }
        },
    )
}

/// Modal placeholder that fetches the details fragment once it is on screen.
pub fn modal_loading(movie_id: i64, back: &str) -> String {
    modal_loading_markup(movie_id, back).into_string()
}

pub fn modal_error(message: &str, back: &str) -> String {
    modal_frame(
        back,
        html! {
            div class="p-10 text-center" {
                p class="text-lg text-gray-200" { (message) }
            }
        },
    )
    .into_string()
}

pub fn movie_modal(view: &ModalView<'_>) -> String {
    let d = view.details;
    let m = &d.movie;
    let release = format_release_date(m.release_date.as_deref());
    let here = with_movie(view.back, m.id);

    modal_frame(
        view.back,
        html! {
            div class="relative h-72 md:h-96 overflow-hidden rounded-t-xl" {
                @if let Some(src) = backdrop_url(m.backdrop_path.as_deref(), BackdropSize::Large) {
                    img class="h-full w-full object-cover" src=(src) alt=(m.title);
                }
                div class="absolute inset-0 bg-gradient-to-t from-gray-950 via-gray-950/70 to-transparent" {}
                div class="absolute bottom-0 left-0 right-0 p-6 flex gap-6 items-end" {
                    div class="hidden md:block w-[150px] shrink-0 overflow-hidden rounded-lg border-4 border-gray-950 shadow-2xl" {
                        (poster(m, PosterSize::Medium))
                    }
                    div {
                        div class="flex flex-wrap gap-2 mb-3" {
                            @for genre in d.genres.iter().take(3) {
                                span class="rounded-full bg-blue-500/20 px-3 py-1 text-xs font-medium text-blue-300" { (genre.name) }
                            }
                        }
                        h2 class="text-3xl md:text-4xl font-bold text-white" { (m.title) }
                        @if let Some(tagline) = d.tagline.as_deref().filter(|t| !t.is_empty()) {
                            p class="mt-1 text-lg italic text-gray-200" { "\"" (tagline) "\"" }
                        }
                        div class="mt-3 flex flex-wrap gap-5 text-sm text-gray-100" {
                            span { "★ " (format_vote(m.vote_average)) "/10" }
                            @if let Some(runtime) = d.runtime.filter(|r| *r > 0) {
                                span { (format_runtime(runtime)) }
                            }
                            span { (release) }
                            span { (m.popularity.round() as i64) " puntos" }
                        }
                    }
                }
            }

            div class="grid grid-cols-1 md:grid-cols-3 gap-6 p-6" {
                div class="md:col-span-2 space-y-6" {
                    (card("Sinopsis", html! {
                        p class="leading-relaxed text-gray-300" {
                            @if m.overview.trim().is_empty() { "Sin sinopsis disponible" } @else { (m.overview) }
                        }
                    }))

                    @if let Some(credits) = &d.credits {
                        @let directors: Vec<&str> = credits.directors().map(|c| c.name.as_str()).collect();
                        @if !directors.is_empty() || !credits.cast.is_empty() {
                            (card("Reparto", html! {
                                @if !directors.is_empty() {
                                    p class="mb-3 text-gray-300" { span class="text-gray-400" { "Dirección: " } (directors.join(", ")) }
                                }
                                ul class="grid grid-cols-2 gap-2 text-sm" {
                                    @for member in credits.cast.iter().take(8) {
                                        li class="text-gray-200" {
                                            (member.name)
                                            @if !member.character.is_empty() {
                                                span class="text-gray-500" { " · " (member.character) }
                                            }
                                        }
                                    }
                                }
                            }))
                        }
                    }

                    @if let Some(trailer) = d.videos.as_ref().and_then(|v| v.trailer()) {
                        (card("Tráiler", html! {
                            div class="aspect-video" {
                                iframe class="h-full w-full rounded-lg" src=(format!("https://www.youtube.com/embed/{}", trailer.key)) title=(trailer.name) allowfullscreen {}
                            }
                        }))
                    }

                    (card("Dónde ver", providers_block(view.providers)))

                    @if !view.similar.is_empty() {
                        (card("Películas similares", html! {
                            div class="grid grid-cols-3 sm:grid-cols-4 gap-3" {
                                @for movie in view.similar.iter().take(8) {
                                    (movie_card(movie, None, view.back))
                                }
                            }
                        }))
                    }
                }

                div class="space-y-6" {
                    @if let Some(favorite) = view.favorite {
                        (card("Tu lista", html! {
                            form method="post" action=(format!("/favoritos/{}", m.id)) {
                                input type="hidden" name="next" value=(here);
                                button class=(favorite_button(favorite)) type="submit" {
                                    @if favorite { "♥ Quitar de favoritos" } @else { "♡ Añadir a favoritos" }
                                }
                            }
                            form class="mt-4 flex items-center gap-2" method="post" action=(format!("/valoraciones/{}", m.id)) {
                                input type="hidden" name="next" value=(here);
                                label class="text-sm text-gray-300" for="rating" { "Tu valoración" }
                                select class="rounded-md bg-gray-800 border border-gray-700 px-2 py-1 text-white" id="rating" name="rating" {
                                    @for value in 1..=10u8 {
                                        option value=(value) selected[view.rating == Some(value)] { (value) }
                                    }
                                }
                                button class="rounded-md bg-gray-700 px-3 py-1 text-sm text-white hover:bg-gray-600" type="submit" { "Valorar" }
                            }
                        }))
                    } @else {
                        (card("Tu lista", html! {
                            a class="text-blue-400 hover:text-blue-300" href=(format!("/login?next={}", urlencoding::encode(&here))) { "Inicia sesión para guardar favoritos" }
                        }))
                    }

                    (card("Estadísticas", html! {
                        dl class="space-y-4 text-sm" {
                            @if d.budget > 0 {
                                (stat("Presupuesto", &format_money(d.budget)))
                            }
                            @if d.revenue > 0 {
                                (stat("Recaudación", &format_money(d.revenue)))
                            }
                            (stat("Fecha de estreno", &release))
                            (stat("Valoración", &format!("{}/10 ({} votos)", format_vote(m.vote_average), m.vote_count)))
                        }
                    }))

                    @if !d.genres.is_empty() {
                        (card("Géneros", html! {
                            div class="flex flex-wrap gap-2" {
                                @for genre in &d.genres {
                                    a class="rounded-md border border-blue-500/20 bg-blue-500/5 px-3 py-1.5 text-sm text-gray-200 hover:bg-blue-500/10" href=(format!("/?genre={}", genre.id)) { (genre.name) }
                                }
                            }
                        }))
                    }

                    @if !d.production_companies.is_empty() {
                        (card("Producción", html! {
                            ul class="space-y-3" {
                                @for company in &d.production_companies {
                                    li class="flex items-center gap-2 text-gray-200" {
                                        @if let Some(logo) = poster_url(company.logo_path.as_deref(), PosterSize::Small) {
                                            img class="h-6 w-auto bg-white/90 rounded px-1" src=(logo) alt=(company.name);
                                        }
                                        (company.name)
                                    }
                                }
                            }
                        }))
                    }
                }
            }
        },
    )
    .into_string()
}

/// `back` with `movieId` added, for links that open the modal in place.
pub fn with_movie(back: &str, movie_id: i64) -> String {
    let sep = if back.contains('?') { '&' } else { '?' };
    format!("{back}{sep}movieId={movie_id}")
}

pub fn format_runtime(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Whole US dollars the way a Spanish locale writes them: `160.000.000 US$`.
/// Four-digit amounts are not grouped.
pub fn format_money(amount: u64) -> String {
    if amount == 0 {
        return "N/A".to_string();
    }
    let digits = amount.to_string();
    let grouped = if digits.len() <= 4 {
        digits
    } else {
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    };
    format!("{grouped} US$")
}

/// `15 de julio, 2010`, or "Fecha desconocida" when missing or unparseable.
pub fn format_release_date(date: Option<&str>) -> String {
    date.and_then(|d| d.parse::<jiff::civil::Date>().ok())
        .map(|d| format!("{} de {}, {}", d.day(), MONTHS[d.month() as usize - 1], d.year()))
        .unwrap_or_else(|| "Fecha desconocida".to_string())
}

fn format_vote(vote: f64) -> String {
    format!("{vote:.1}")
}

fn list_label(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Popular => "Populares",
        ListKind::Trending => "Tendencias",
    }
}

fn page(title: &str, user: Option<&AuthenticatedUser>, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="es" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | " (SITE_NAME) }
                script src=(TAILWIND_CDN) {}
                script type="module" src=(DATASTAR_CDN) {}
            }
            body class="min-h-screen flex flex-col bg-gray-950 text-gray-100" {
                (navbar(user))
                main class="flex-1" { (body) }
                (footer())
            }
        }
    }
    .into_string()
}

fn navbar(user: Option<&AuthenticatedUser>) -> Markup {
    html! {
        header class="sticky top-0 z-40 border-b border-gray-800 bg-gray-950/80 backdrop-blur" {
            nav class="max-w-7xl mx-auto flex items-center justify-between px-4 py-3" {
                a class="text-xl font-bold bg-gradient-to-r from-blue-400 to-purple-600 bg-clip-text text-transparent" href="/" { (SITE_NAME) }
                div class="flex items-center gap-3" {
                    a class="text-sm text-gray-300 hover:text-white" href="/peliculas" { "Películas" }
                    @if let Some(user) = user {
                        a class="text-sm text-gray-300 hover:text-white" href="/recomendaciones" { "Recomendaciones" }
                        a class="rounded-md bg-gray-800 px-3 py-1.5 text-sm text-white hover:bg-gray-700" href="/perfil" { (user.display_name()) }
                        form method="post" action="/logout" {
                            button class="text-sm text-gray-400 hover:text-white" type="submit" { "Cerrar sesión" }
                        }
                    } @else {
                        a class="text-sm text-gray-300 hover:text-white" href="/login" { "Iniciar Sesión" }
                        a class="rounded-md bg-blue-600 px-3 py-1.5 text-sm font-semibold text-white hover:bg-blue-700" href="/registro" { "Crear Cuenta" }
                    }
                }
            }
        }
    }
}

fn footer() -> Markup {
    html! {
        footer class="mt-16 border-t border-gray-800 bg-gray-950" {
            div class="max-w-7xl mx-auto grid grid-cols-1 md:grid-cols-3 gap-8 px-4 py-10 text-sm" {
                div {
                    h3 class="mb-3 font-semibold text-white" { "Navegación" }
                    ul class="space-y-2 text-gray-300" {
                        li { a class="hover:text-blue-400" href="/" { "Inicio" } }
                        li { a class="hover:text-blue-400" href="/peliculas?type=popular" { "Populares" } }
                        li { a class="hover:text-blue-400" href="/peliculas?type=trending" { "Tendencias" } }
                        li { a class="hover:text-blue-400" href="/recomendaciones" { "Recomendaciones" } }
                    }
                }
                div {
                    h3 class="mb-3 font-semibold text-white" { "Legal" }
                    a class="text-gray-300 hover:text-blue-400" href="/terminos" { "Términos y Condiciones" }
                }
                div {
                    h3 class="mb-3 font-semibold text-white" { "Contacto" }
                    a class="text-gray-300 hover:text-blue-400" href=(format!("mailto:{CONTACT_EMAIL}")) { (CONTACT_EMAIL) }
                    p class="mt-3 text-xs text-gray-500" { "Datos proporcionados por TMDB." }
                }
            }
        }
    }
}

fn recommended_widget(movies: &[Movie], back: &str) -> Markup {
    html! {
        @if !movies.is_empty() {
            section class="rounded-xl bg-black/30 p-6 shadow-lg" {
                h2 class="text-2xl font-semibold text-white mb-4" { "Recomendado para ti" }
                div class="grid grid-cols-2 sm:grid-cols-3 md:grid-cols-5 gap-4" {
                    @for movie in movies.iter().take(WIDGET_SIZE) {
                        (movie_card(movie, None, back))
                    }
                }
                @if movies.len() > WIDGET_SIZE {
                    div class="mt-4 text-right" {
                        a class="text-blue-400 hover:text-blue-300" href="/recomendaciones" { "Ver más recomendaciones" }
                    }
                }
            }
        }
    }
}

fn favorite_genres_list(genres: &[Genre], back: &str) -> Markup {
    html! {
        section class="rounded-xl bg-gray-900 p-6" {
            h2 class="text-xl font-semibold text-white mb-3" { "Tus géneros favoritos" }
            @if genres.is_empty() {
                p class="text-gray-400" {
                    "Aún no has elegido géneros. "
                    a class="text-blue-400 hover:text-blue-300" href="/perfil" { "Elígelos en tu perfil" }
                }
            } @else {
                div class="flex flex-wrap gap-2" {
                    @for genre in genres {
                        div class="flex items-center rounded-full bg-gradient-to-r from-blue-500 to-purple-600 text-sm text-white" {
                            a class="pl-4 pr-2 py-1.5" href=(format!("/?genre={}", genre.id)) { (genre.name) }
                            form method="post" action=(format!("/perfil/generos/{}", genre.id)) {
                                input type="hidden" name="next" value=(back);
                                button class="pr-3 py-1.5 text-white/70 hover:text-white" type="submit" title="Quitar" { "×" }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn movie_grid(movies: &[Movie], favorite_ids: &[i64], back: &str) -> Markup {
    html! {
        @if movies.is_empty() {
            div class="rounded-xl bg-gray-900 p-10 text-center" {
                p class="text-lg text-gray-200" { "No se encontraron películas" }
                p class="mt-1 text-sm text-gray-400" { "Intenta con otra búsqueda o categoría" }
            }
        } @else {
            div class="grid grid-cols-2 sm:grid-cols-3 md:grid-cols-4 lg:grid-cols-5 gap-4" {
                @for movie in movies {
                    (movie_card(movie, Some(favorite_ids.contains(&movie.id)), back))
                }
            }
        }
    }
}

/// With a known favorite state the card gets a heart that posts the card's
/// own listing data, so the favorite is saved without a details fetch.
fn movie_card(movie: &Movie, favorite: Option<bool>, back: &str) -> Markup {
    html! {
        div class="relative" {
            a class="group block overflow-hidden rounded-lg bg-gray-900 shadow hover:ring-2 hover:ring-blue-500" href=(with_movie(back, movie.id)) {
                div class="relative aspect-[2/3] bg-gray-800" {
                    (poster(movie, PosterSize::Large))
                    span class="absolute top-2 right-2 rounded bg-black/70 px-1.5 py-0.5 text-xs text-yellow-300" { "★ " (format_vote(movie.vote_average)) }
                }
                div class="p-3" {
                    h3 class="truncate font-medium text-white" { (movie.title) }
                    p class="text-xs text-gray-400" { (movie.release_year().unwrap_or("—")) }
                }
            }
            @if let Some(favorite) = favorite {
                form class="absolute top-2 left-2" method="post" action=(format!("/favoritos/{}", movie.id)) {
                    input type="hidden" name="next" value=(back);
                    input type="hidden" name="title" value=(movie.title);
                    @if let Some(path) = &movie.poster_path {
                        input type="hidden" name="poster_path" value=(path);
                    }
                    @if let Some(date) = &movie.release_date {
                        input type="hidden" name="release_date" value=(date);
                    }
                    input type="hidden" name="vote_average" value=(movie.vote_average);
                    @for genre in &movie.genre_ids {
                        input type="hidden" name="genre" value=(genre);
                    }
                    @if favorite {
                        button class="rounded-full bg-black/70 px-2 py-1 text-red-500 hover:text-red-400" type="submit" title="Quitar de favoritos" { "♥" }
                    } @else {
                        button class="rounded-full bg-black/70 px-2 py-1 text-white hover:text-red-400" type="submit" title="Añadir a favoritos" { "♡" }
                    }
                }
            }
        }
    }
}

fn poster(movie: &Movie, size: PosterSize) -> Markup {
    html! {
        @match poster_url(movie.poster_path.as_deref(), size) {
            Some(src) => {
                img class="h-full w-full object-cover" src=(src) alt=(movie.title) loading="lazy";
            },
            None => div class="flex h-full w-full items-center justify-center text-sm text-gray-500" { "Sin imagen" },
        }
    }
}

fn providers_block(providers: &[WatchProvider]) -> Markup {
    html! {
        @if providers.is_empty() {
            p class="text-gray-400" { "No hay plataformas disponibles en tu región" }
        } @else {
            div class="space-y-4" {
                @for kind in [ProviderType::Stream, ProviderType::Rent, ProviderType::Buy] {
                    @let group: Vec<&WatchProvider> = providers.iter().filter(|p| p.provider_type == kind).collect();
                    @if !group.is_empty() {
                        div {
                            h4 class="mb-2 text-sm font-semibold text-gray-400" { (kind.label()) }
                            div class="flex flex-wrap gap-3" {
                                @for provider in group {
                                    (provider_link(provider))
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn provider_link(provider: &WatchProvider) -> Markup {
    let logo = poster_url(provider.logo_path.as_deref(), PosterSize::Small);
    let inner = html! {
        @if let Some(logo) = &logo {
            img class="h-10 w-10 rounded-lg" src=(logo) alt=(provider.provider_name);
        }
        span class="text-sm text-gray-200" { (provider.provider_name) }
    };
    html! {
        @match &provider.link {
            Some(href) => a class="flex items-center gap-2 rounded-lg bg-gray-800 px-2 py-1 hover:bg-gray-700" href=(href) target="_blank" rel="noopener noreferrer" { (inner) },
            None => div class="flex items-center gap-2 rounded-lg bg-gray-800 px-2 py-1" { (inner) },
        }
    }
}

fn modal_slot(open_movie: Option<i64>, back: &str) -> Markup {
    match open_movie {
        Some(id) => modal_loading_markup(id, back),
        None => html! { div id="modal" {} },
    }
}

fn modal_loading_markup(movie_id: i64, back: &str) -> Markup {
    let url = format!("/pelicula/{movie_id}?next={}", urlencoding::encode(back));
    html! {
        div id="modal" class="fixed inset-0 z-50 flex items-center justify-center bg-black/70" data-init=(PreEscaped(format!("@get('{}')", url))) {
            div class="rounded-xl bg-gray-900 p-10 text-center shadow-2xl" {
                div class="mx-auto h-12 w-12 rounded-full border-4 border-blue-200 border-t-blue-600 animate-spin" {}
                p class="mt-6 text-gray-200" { "Cargando detalles de la película..." }
                a class="mt-4 inline-block text-sm text-gray-400 hover:text-white" href=(back) { "Cancelar" }
            }
        }
    }
}

fn modal_frame(back: &str, inner: Markup) -> Markup {
    html! {
        div id="modal" class="fixed inset-0 z-50 overflow-y-auto bg-black/70" {
            div class="relative max-w-6xl mx-auto my-8 rounded-xl bg-gray-950 shadow-2xl" {
                form class="absolute top-4 right-4 z-10" method="post" action="/pelicula/cerrar" {
                    input type="hidden" name="next" value=(back);
                    button class="rounded-full bg-black/50 h-9 w-9 text-white hover:bg-black/70" type="submit" aria-label="Cerrar" { "✕" }
                }
                (inner)
            }
        }
    }
}

fn card(title: &str, body: Markup) -> Markup {
    html! {
        div class="overflow-hidden rounded-xl border border-gray-800 bg-gray-900 shadow-md" {
            div class="border-b border-gray-800 bg-blue-500/10 px-5 py-3" {
                h3 class="text-lg font-bold text-white" { (title) }
            }
            div class="p-5" { (body) }
        }
    }
}

fn stat(label: &str, value: &str) -> Markup {
    html! {
        div {
            dt class="text-gray-400" { (label) }
            dd class="font-semibold text-white" { (value) }
        }
    }
}

fn auth_card(title: &str, body: Markup) -> Markup {
    html! {
        div class="flex min-h-[70vh] items-center justify-center px-4" {
            div class="w-full max-w-md rounded-xl bg-gray-900 p-8 shadow-xl" {
                h1 class="mb-6 text-center text-2xl font-bold text-white" { (title) }
                (body)
            }
        }
    }
}

fn text_input(name: &str, label: &str, kind: &str, value: &str, required: bool) -> Markup {
    html! {
        div {
            label class="block text-sm text-gray-300" for=(name) { (label) }
            input class="mt-1 w-full rounded-md bg-gray-800 border border-gray-700 px-3 py-2 text-white focus:border-blue-500 focus:outline-none" type=(kind) name=(name) id=(name) value=(value) required[required];
        }
    }
}

fn error_box(message: &str) -> Markup {
    html! {
        div class="mb-4 rounded-lg border border-red-800 bg-red-900/40 p-4 text-sm text-red-200" role="alert" { (message) }
    }
}

fn pill_class(active: bool) -> &'static str {
    if active {
        "cursor-pointer rounded-full bg-gradient-to-r from-blue-500 to-purple-600 px-4 py-2 text-sm font-medium text-white shadow-sm"
    } else {
        "cursor-pointer rounded-full bg-gray-800 px-4 py-2 text-sm font-medium text-gray-200 hover:bg-gray-700"
    }
}

fn page_button(current: bool) -> &'static str {
    if current {
        "rounded-md bg-blue-600 px-3 py-2 text-white"
    } else {
        "rounded-md bg-gray-800 px-3 py-2 text-gray-200 hover:bg-gray-700"
    }
}

fn favorite_button(favorite: bool) -> &'static str {
    if favorite {
        "w-full rounded-md bg-red-600 px-4 py-2 font-semibold text-white hover:bg-red-700"
    } else {
        "w-full rounded-md bg-gray-800 px-4 py-2 font-semibold text-white hover:bg-gray-700"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_and_money() {
        assert_eq!(format_runtime(148), "2h 28m");
        assert_eq!(format_runtime(45), "0h 45m");
        assert_eq!(format_money(0), "N/A");
        assert_eq!(format_money(1000), "1000 US$");
        assert_eq!(format_money(25_000), "25.000 US$");
        assert_eq!(format_money(160_000_000), "160.000.000 US$");
    }

    #[test]
    fn release_dates_in_spanish() {
        assert_eq!(format_release_date(Some("2010-07-15")), "15 de julio, 2010");
        assert_eq!(format_release_date(Some("1999-01-01")), "1 de enero, 1999");
        assert_eq!(format_release_date(Some("")), "Fecha desconocida");
        assert_eq!(format_release_date(None), "Fecha desconocida");
    }

    #[test]
    fn movie_links_keep_existing_query() {
        assert_eq!(with_movie("/", 550), "/?movieId=550");
        assert_eq!(with_movie("/peliculas?type=trending&page=2", 550), "/peliculas?type=trending&page=2&movieId=550");
    }

    #[test]
    fn cards_carry_a_favorite_toggle_with_their_own_snapshot() {
        let movie: Movie = serde_json::from_str(
            r#"{"id": 603, "title": "Matrix", "poster_path": "/m.jpg", "release_date": "1999-03-31", "vote_average": 8.2, "genre_ids": [28, 878]}"#,
        )
        .unwrap();
        let html = movie_grid(std::slice::from_ref(&movie), &[], "/?tab=popular").into_string();
        assert!(html.contains(r#"action="/favoritos/603""#));
        assert!(html.contains(r#"name="next" value="/?tab=popular""#));
        assert!(html.contains(r#"name="title" value="Matrix""#));
        assert!(html.contains(r#"name="poster_path" value="/m.jpg""#));
        assert!(html.contains(r#"name="genre" value="878""#));
        assert!(html.contains("Añadir a favoritos"));

        let html = movie_grid(std::slice::from_ref(&movie), &[603], "/").into_string();
        assert!(html.contains("Quitar de favoritos"));
    }

    #[test]
    fn loading_modal_requests_details_fragment() {
        let html = modal_loading(550, "/?tab=trending");
        assert!(html.contains(r#"id="modal""#));
        assert!(html.contains("@get('/pelicula/550?next=%2F%3Ftab%3Dtrending')"));
        assert!(html.contains("Cargando detalles de la película..."));
    }

    #[test]
    fn modal_renders_overview_fallback_and_sign_in_prompt() {
        let details: MovieDetails =
            serde_json::from_str(r#"{"id": 550, "title": "El club de la lucha", "overview": ""}"#).unwrap();
        let html = movie_modal(&ModalView { details: &details, providers: &[], similar: &[], favorite: None, rating: None, back: "/" });
        assert!(html.contains("Sin sinopsis disponible"));
        assert!(html.contains("Fecha desconocida"));
        assert!(html.contains("Inicia sesión para guardar favoritos"));
        assert!(!html.contains("/favoritos/550"));

        let html = movie_modal(&ModalView {
            details: &details,
            providers: &[],
            similar: &[],
            favorite: Some(true),
            rating: Some(8),
            back: "/",
        });
        assert!(html.contains(r#"action="/favoritos/550""#));
        assert!(html.contains("Quitar de favoritos"));
        assert!(html.contains(r#"<option value="8" selected>"#));
    }

    #[test]
    fn widget_caps_at_five_and_links_out() {
        let movies: Vec<Movie> = (1..=7)
            .map(|id| serde_json::from_value(serde_json::json!({ "id": id, "title": format!("Peli {id}") })).unwrap())
            .collect();
        let html = recommended_widget(&movies, "/").into_string();
        assert!(html.contains("Recomendado para ti"));
        assert!(html.contains("Peli 5"));
        assert!(!html.contains("Peli 6"));
        assert!(html.contains("Ver más recomendaciones"));

        let html = recommended_widget(&movies[..3], "/").into_string();
        assert!(!html.contains("Ver más recomendaciones"));
        assert!(recommended_widget(&[], "/").into_string().is_empty());
    }

    #[test]
    fn empty_grid_says_so() {
        let html = movie_grid(&[], &[], "/").into_string();
        assert!(html.contains("No se encontraron películas"));
    }
}
