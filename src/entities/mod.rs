pub mod favorite_genres;
pub mod favorites;
pub mod ratings;
pub mod sessions;
pub mod users;
