//! Self-hosted backend on SQLite: accounts, sessions and preference rows.

mod auth;
mod password;
mod store;

use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct LocalBackend {
    db: DatabaseConnection,
}

impl LocalBackend {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}
