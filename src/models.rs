use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_average: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popularity: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genre_ids: Vec<i64>,
}

impl Movie {
    pub fn release_year(&self) -> Option<&str> {
        self.release_date.as_deref().and_then(|d| d.get(..4)).filter(|y| !y.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionCompany {
    pub id: i64,
    pub name: String,
    pub logo_path: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub character: String,
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub job: String,
    #[serde(default)]
    pub department: String,
    pub profile_path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl Credits {
    pub fn directors(&self) -> impl Iterator<Item = &CrewMember> {
        self.crew.iter().filter(|c| c.job == "Director")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

impl Videos {
    /// First YouTube trailer, preferring official uploads.
    pub fn trailer(&self) -> Option<&Video> {
        let trailers = || self.results.iter().filter(|v| v.site == "YouTube" && v.kind == "Trailer");
        trailers().find(|v| v.official).or_else(|| trailers().next())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub runtime: Option<u32>,
    pub tagline: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub budget: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub revenue: u64,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    pub credits: Option<Credits>,
    pub videos: Option<Videos>,
}

impl From<&MovieDetails> for Movie {
    fn from(details: &MovieDetails) -> Self {
        let mut movie = details.movie.clone();
        if movie.genre_ids.is_empty() {
            movie.genre_ids = details.genres.iter().map(|g| g.id).collect();
        }
        movie
    }
}

/// One page of a listing endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub results: Vec<T>,
    pub total_pages: Option<u32>,
}

impl<T> Paged<T> {
    pub fn empty() -> Self {
        Self { results: Vec::new(), total_pages: None }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// The two browsable listings.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    #[default]
    Popular,
    Trending,
}

impl ListKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Popular => "popular",
            ListKind::Trending => "trending",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum ProviderType {
    Stream,
    Rent,
    Buy,
}

impl ProviderType {
    pub fn label(self) -> &'static str {
        match self {
            ProviderType::Stream => "Streaming",
            ProviderType::Rent => "Alquiler",
            ProviderType::Buy => "Compra",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WatchProvider {
    pub provider_id: i64,
    pub provider_name: String,
    pub logo_path: Option<String>,
    pub link: Option<String>,
    pub provider_type: ProviderType,
}

/// A favorite row: the key pair plus the movie as it looked when favorited.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: String,
    pub movie_id: i64,
    #[serde(rename = "movie_data")]
    pub movie: Movie,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FavoriteGenreSet {
    pub genre_ids: Vec<i64>,
    pub updated_at: Option<Timestamp>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().filter(|n| !n.trim().is_empty()).unwrap_or("Perfil")
    }
}

/// Who a preference call acts for. The token is what the hosted backend
/// checks row ownership against; the local backend ignores it.
#[derive(Clone, Debug, PartialEq)]
pub struct Principal {
    pub user_id: String,
    pub access_token: Option<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), access_token: None }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub full_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movie_tolerates_nulls_and_missing_fields() {
        let json = r#"{
            "id": 550,
            "title": "El club de la lucha",
            "overview": null,
            "poster_path": null,
            "vote_average": 8.4
        }"#;
        let movie: Movie = serde_json::from_str(json).unwrap();
        assert_eq!(movie.id, 550);
        assert_eq!(movie.overview, "");
        assert_eq!(movie.poster_path, None);
        assert!(movie.genre_ids.is_empty());
        assert_eq!(movie.release_year(), None);
    }

    #[test]
    fn details_flatten_movie_and_fill_genre_ids() {
        let json = r#"{
            "id": 27205,
            "title": "Origen",
            "overview": "Dom Cobb es un ladrón",
            "release_date": "2010-07-15",
            "vote_average": 8.4,
            "vote_count": 35000,
            "popularity": 90.5,
            "genres": [{"id": 28, "name": "Acción"}, {"id": 878, "name": "Ciencia ficción"}],
            "runtime": 148,
            "tagline": "Tu mente es la escena del crimen",
            "budget": 160000000,
            "revenue": 825532764,
            "production_companies": [{"id": 923, "name": "Legendary Pictures", "logo_path": null}],
            "credits": {"cast": [{"id": 6193, "name": "Leonardo DiCaprio", "character": "Cobb", "profile_path": null, "order": 0}],
                        "crew": [{"id": 525, "name": "Christopher Nolan", "job": "Director", "department": "Directing", "profile_path": null}]},
            "videos": {"results": [{"key": "abc", "name": "Teaser", "site": "YouTube", "type": "Teaser", "official": true},
                                   {"key": "xyz", "name": "Tráiler", "site": "YouTube", "type": "Trailer", "official": false}]}
        }"#;
        let details: MovieDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.movie.title, "Origen");
        assert_eq!(details.runtime, Some(148));
        assert_eq!(details.movie.release_year(), Some("2010"));

        let credits = details.credits.as_ref().unwrap();
        assert_eq!(credits.directors().next().unwrap().name, "Christopher Nolan");
        assert_eq!(details.videos.as_ref().unwrap().trailer().unwrap().key, "xyz");

        let snapshot = Movie::from(&details);
        assert_eq!(snapshot.genre_ids, vec![28, 878]);
    }

    #[test]
    fn display_name_falls_back_when_blank() {
        let mut user = AuthenticatedUser { id: "u1".into(), email: None, full_name: Some("  ".into()) };
        assert_eq!(user.display_name(), "Perfil");
        user.full_name = Some("Ana".into());
        assert_eq!(user.display_name(), "Ana");
    }
}
