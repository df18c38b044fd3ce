use std::time::Duration;

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::post::{Post, StateResponse, Visibility};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: String::new(),
            http_client: None,
        }
    }
}

/// Blocking HTTP client for the post service. Requests go to `/api` as a
/// JSON request under a `json` form field; the legacy search endpoint is a
/// GET against `state.xml`.
#[derive(Debug)]
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("lanblog client user agent required");
        }

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("parse server base url {:?}", config.base_url))?;

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(Duration::from_secs(20))
                .build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    /// Fetches the latest page of posts, newest first.
    pub fn get_state(&self, limit: usize) -> Result<Vec<Post>> {
        let body = serde_json::json!({"m": "get", "limit": limit});
        let state: StateResponse = self.call_api(&body).context("fetch posts")?;
        Ok(state.into_posts())
    }

    /// Publishes a post with the given visibility scope. Length validation
    /// happens client-side before this is called.
    pub fn push(&self, msg: &str, scope: Visibility) -> Result<()> {
        let body = serde_json::json!({
            "m": "gen_push",
            "posts": [{"msg": msg, "perms": scope.wire_code()}],
        });
        // response carries the caller's own posts; the follow-up refresh
        // re-fetches them, so the body only needs to be well-formed JSON
        let _: serde_json::Value = self.call_api(&body).context("push post")?;
        Ok(())
    }

    /// Queries the legacy search endpoint. Results decode with the same
    /// schemas as the feed and flow through the same renderer.
    pub fn search(&self, query: &str) -> Result<Vec<Post>> {
        let endpoint = self.base_url.join("state.xml").context("build search url")?;
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC);
        let url = format!("{}?m=sdns.search&q={}", endpoint, encoded);

        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .context("search request")?;

        if !response.status().is_success() {
            bail!("search failed with status {}", response.status());
        }

        let state: StateResponse = response.json().context("decode search response")?;
        Ok(state.into_posts())
    }

    fn call_api<T: DeserializeOwned>(&self, body: &serde_json::Value) -> Result<T> {
        let url = self.base_url.join("api").context("build api url")?;
        let response = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .form(&[("json", body.to_string())])
            .send()
            .context("api request")?;

        if !response.status().is_success() {
            bail!("api request failed with status {}", response.status());
        }

        Ok(response.json()?)
    }
}
