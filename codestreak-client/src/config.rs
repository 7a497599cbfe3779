use std::env;
use std::time::Duration;

use anyhow::Context;
use codestreak_common::Username;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    /// The signed-in user. Used for self-checks and as the cache identity.
    pub username: Option<Username>,
    pub request_timeout: Duration,
    pub search_debounce: Duration,
    pub search_limit: u32,
    pub min_query_len: usize,
    pub solves_limit: u32,
    pub cache_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            username: None,
            request_timeout: Duration::from_secs(15),
            search_debounce: Duration::from_millis(300),
            search_limit: 20,
            min_query_len: 2,
            solves_limit: 10,
            cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(url) = lookup("CODESTREAK_API_URL") {
            reqwest::Url::parse(&url).with_context(|| format!("CODESTREAK_API_URL is not a url: {url}"))?;
            config.api_url = url;
        }
        config.token = lookup("CODESTREAK_TOKEN").filter(|t| !t.is_empty());
        config.username = lookup("CODESTREAK_USERNAME").and_then(Username::from);
        if let Some(secs) = lookup("CODESTREAK_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().with_context(|| format!("CODESTREAK_TIMEOUT_SECS: {secs}"))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = lookup("CODESTREAK_CACHE_TTL_SECS") {
            let secs: u64 = secs.parse().with_context(|| format!("CODESTREAK_CACHE_TTL_SECS: {secs}"))?;
            config.cache_ttl = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Cache identity for the session's own resources.
    pub fn owner(&self) -> String {
        self.username.as_ref().map(|u| u.0.to_lowercase()).unwrap_or_else(|| "me".to_string())
    }
}
