//! Shared HTTP plumbing for the platform clients: authentication, retry
//! with backoff, and pagination.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::errors::PlatformError;
use crate::models::Platform;

/// Longest single wait between retries.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How a platform expects its token.
#[derive(Clone)]
pub enum Auth {
    None,
    /// `Authorization: Bearer <token>` (GitHub).
    Bearer(String),
    /// `PRIVATE-TOKEN: <token>` (GitLab).
    PrivateToken(String),
    /// Basic auth with an empty user and the PAT as password (Azure DevOps).
    BasicPat(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::None => "None",
            Self::Bearer(_) => "Bearer",
            Self::PrivateToken(_) => "PrivateToken",
            Self::BasicPat(_) => "BasicPat",
        };
        write!(f, "Auth::{kind}")
    }
}

/// Query parameters a listing endpoint pages with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// `per_page` + 1-based `page` (GitHub, GitLab).
    PageNumber,
    /// `$top` + `$skip` (Azure DevOps).
    TopSkip,
}

/// What to do with a non-success response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Retry {
        after: Option<Duration>,
        rate_limited: bool,
    },
    Unauthorized,
    Failed,
}

/// A JSON API client bound to one platform's base URL and credentials.
#[derive(Debug, Clone)]
pub struct ApiClient {
    platform: Platform,
    http: reqwest::Client,
    base: Url,
    auth: Auth,
    max_retries: u32,
    base_delay: Duration,
    page_size: u32,
}

impl ApiClient {
    pub fn new(
        platform: Platform,
        base_url: &str,
        auth: Auth,
        config: &HttpConfig,
    ) -> Result<Self, PlatformError> {
        let base = Url::parse(base_url).map_err(|e| PlatformError::NotConfigured {
            platform: platform.label().to_string(),
            detail: format!("invalid API URL '{base_url}': {e}"),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("commitcensus/", env!("CARGO_PKG_VERSION"))),
        );
        if platform == Platform::GitHub {
            headers.insert(
                "x-github-api-version",
                HeaderValue::from_static("2022-11-28"),
            );
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| PlatformError::HttpError {
                platform: platform.label().to_string(),
                source,
            })?;

        debug!(platform = %platform, api_url = %base, ?auth, "created API client");
        Ok(Self {
            platform,
            http,
            base,
            auth,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            page_size: config.page_size,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Base URL extended by `segments`, each percent-encoded as a single
    /// path segment (a `/` inside a segment becomes `%2F`).
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PlatformError::NotConfigured {
                platform: self.platform.label().to_string(),
                detail: format!("'{}' cannot be used as an API base URL", self.base),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url` as JSON, retrying transient failures.
    pub async fn get_json(&self, url: Url) -> Result<Value, PlatformError> {
        let mut attempt = 0u32;
        loop {
            let sent = self.authorize(self.http.get(url.clone())).send().await;
            let resp = match sent {
                Ok(resp) => resp,
                Err(e) if is_transient(&e) && attempt < self.max_retries => {
                    let delay = backoff_delay(self.base_delay, attempt, None);
                    warn!(platform = %self.platform, %url, error = %e, ?delay, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
                Err(source) => {
                    return Err(PlatformError::HttpError {
                        platform: self.platform.label().to_string(),
                        source,
                    })
                }
            };

            let status = resp.status();
            if status.is_success() {
                return resp.json::<Value>().await.map_err(|e| PlatformError::ParseError {
                    platform: self.platform.label().to_string(),
                    detail: e.to_string(),
                });
            }

            match classify_response(status, resp.headers(), chrono::Utc::now().timestamp()) {
                ResponseClass::Retry { after, rate_limited } if attempt < self.max_retries => {
                    let delay = backoff_delay(self.base_delay, attempt, after);
                    warn!(
                        platform = %self.platform,
                        status = status.as_u16(),
                        attempt = attempt + 1,
                        rate_limited,
                        ?delay,
                        "retrying request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                ResponseClass::Retry {
                    rate_limited: true, ..
                } => {
                    return Err(PlatformError::RateLimited {
                        platform: self.platform.label().to_string(),
                        attempts: attempt + 1,
                    })
                }
                ResponseClass::Unauthorized => {
                    return Err(PlatformError::AuthenticationFailed {
                        platform: self.platform.label().to_string(),
                        detail: format!("HTTP {status} from {}", url.path()),
                    })
                }
                ResponseClass::Retry { .. } | ResponseClass::Failed => {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(PlatformError::ApiError {
                        platform: self.platform.label().to_string(),
                        status: status.as_u16(),
                        body: truncate(&body, 200),
                    });
                }
            }
        }
    }

    /// GET every page of a listing endpoint and concatenate the items.
    ///
    /// Paging stops at the first page shorter than the page size.
    pub async fn get_all(&self, url: Url, paging: Paging) -> Result<Vec<Value>, PlatformError> {
        let mut items = Vec::new();
        let size = self.page_size.to_string();

        for page in 0u32.. {
            let mut page_url = url.clone();
            {
                let mut query = page_url.query_pairs_mut();
                match paging {
                    Paging::PageNumber => {
                        query
                            .append_pair("per_page", &size)
                            .append_pair("page", &(page + 1).to_string());
                    }
                    Paging::TopSkip => {
                        let skip = u64::from(page) * u64::from(self.page_size);
                        query
                            .append_pair("$top", &size)
                            .append_pair("$skip", &skip.to_string());
                    }
                }
            }

            let body = self.get_json(page_url).await?;
            let batch = page_items(body).map_err(|detail| PlatformError::ParseError {
                platform: self.platform.label().to_string(),
                detail,
            })?;
            let count = batch.len();
            items.extend(batch);
            debug!(platform = %self.platform, page = page + 1, count, "fetched page");

            if is_last_page(count, self.page_size) {
                break;
            }
        }
        Ok(items)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Auth::None => req,
            Auth::Bearer(token) => req.bearer_auth(token),
            Auth::PrivateToken(token) => req.header("PRIVATE-TOKEN", token),
            Auth::BasicPat(token) => req.basic_auth("", Some(token)),
        }
    }
}

/// Decide how to treat a failed response. `now` is the current Unix time,
/// used to turn GitHub's rate-limit reset stamp into a wait.
pub fn classify_response(status: StatusCode, headers: &HeaderMap, now: i64) -> ResponseClass {
    let rate_limit_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && rate_limit_exhausted)
    {
        let after = retry_after(headers).or_else(|| rate_limit_reset(headers, now));
        return ResponseClass::Retry {
            after,
            rate_limited: true,
        };
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ResponseClass::Unauthorized;
    }
    if status.is_server_error() {
        return ResponseClass::Retry {
            after: None,
            rate_limited: false,
        };
    }
    ResponseClass::Failed
}

/// Exponential backoff from `base`, unless the server named a wait.
pub fn backoff_delay(base: Duration, attempt: u32, server_hint: Option<Duration>) -> Duration {
    server_hint
        .unwrap_or_else(|| base.saturating_mul(1u32 << attempt.min(16)))
        .min(MAX_BACKOFF)
}

/// `true` once a page came back short.
pub fn is_last_page(count: usize, page_size: u32) -> bool {
    count < page_size as usize
}

/// The items of one listing page: a bare array (GitHub, GitLab) or a
/// `{ "count": n, "value": [...] }` envelope (Azure DevOps).
pub fn page_items(body: Value) -> Result<Vec<Value>, String> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("value") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err("expected a `value` array in the response object".into()),
        },
        other => Err(format!("expected a JSON array, got {}", json_kind(&other))),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn rate_limit_reset(headers: &HeaderMap, now: i64) -> Option<Duration> {
    let reset: i64 = headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some(Duration::from_secs(reset.saturating_sub(now).max(1) as u64))
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
