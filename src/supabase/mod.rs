//! Hosted backend: GoTrue for accounts, PostgREST for preference rows.

mod auth;
mod store;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl SupabaseClient {
    pub fn new(http: reqwest::Client, base_url: String, anon_key: String) -> Self {
        let client = Self { http, base_url: base_url.trim_end_matches('/').to_string(), anon_key };
        if !client.is_configured() {
            tracing::warn!("SUPABASE_URL or SUPABASE_ANON_KEY missing; accounts and preferences will fail");
        }
        client
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && !self.anon_key.trim().is_empty()
    }

    /// Every call carries the anon key; the bearer is the user's token when
    /// there is one so row-level policies apply.
    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let bearer = token.unwrap_or(&self.anon_key);
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }
}

/// GoTrue and PostgREST disagree on where the message lives.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg.or(self.error_description).or(self.message).or(self.error)
    }
}

/// Non-2xx responses become the backend's own message when it sent one.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| format!("HTTP {status}"))
}
