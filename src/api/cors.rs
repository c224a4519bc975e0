//! CORS policy driven by a hostname allow-list.
//!
//! An origin is granted access when its host equals an allow-listed entry
//! or is a subdomain of one, so `pathz.xyz` also admits
//! `https://dapp.pathz.xyz`.

use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, PRAGMA};
use axum::http::{HeaderValue, Method, StatusCode, header, request};
use axum::middleware::Next;
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Hosts allowed when `ALLOWED_ORIGINS` is not set.
const DEFAULT_ALLOWED_HOSTS: [&str; 2] = ["pathz.xyz", "localhost"];

/// Set of hostnames (and, implicitly, their subdomains) granted CORS access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginAllowlist {
    hosts: Vec<String>,
}

impl Default for OriginAllowlist {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_HOSTS)
    }
}

impl OriginAllowlist {
    /// Builds an allow-list from hostnames or full origins.
    ///
    /// Entries are normalized to a lowercase host without scheme or port;
    /// blank entries are ignored.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hosts = entries
            .into_iter()
            .filter_map(|entry| host_of(entry.as_ref()))
            .collect();
        Self { hosts }
    }

    /// Parses a comma-separated list such as `pathz.xyz, localhost`.
    #[must_use]
    pub fn from_csv(list: &str) -> Self {
        Self::new(list.split(','))
    }

    /// Returns the normalized hosts.
    #[must_use]
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Returns `true` if `origin` (e.g. `https://dapp.pathz.xyz:443`) may
    /// access the relay.
    #[must_use]
    pub fn allows(&self, origin: &str) -> bool {
        let Some(host) = host_of(origin) else {
            return false;
        };
        self.hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Builds the `tower-http` CORS layer enforcing this allow-list.
    #[must_use]
    pub fn layer(&self) -> CorsLayer {
        let allowlist = self.clone();
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(
                move |origin: &HeaderValue, _parts: &request::Parts| {
                    origin.to_str().is_ok_and(|o| allowlist.allows(o))
                },
            ))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, AUTHORIZATION, PRAGMA, CACHE_CONTROL])
            .allow_credentials(true)
    }
}

/// Answers CORS preflight requests with `204 No Content`.
///
/// The CORS layer short-circuits preflights with an empty `200`; this
/// middleware sits outside it and only rewrites the status.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_preflight = request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = next.run(request).await;
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Extracts the lowercase host from an origin or bare hostname.
fn host_of(origin: &str) -> Option<String> {
    let origin = origin.trim();
    let rest = origin
        .split_once("://")
        .map_or(origin, |(_, authority)| authority);
    let authority = rest.split('/').next().unwrap_or_default();

    let host = if let Some(bracketed) = authority.strip_prefix('[') {
        bracketed.split(']').next().unwrap_or_default()
    } else {
        authority.split(':').next().unwrap_or_default()
    };

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}
