use std::fmt;

use reqwest::Url;
use tracing::{debug, warn};

use super::api_client::ClientError;

/// Port the API listens on when nothing else is configured
pub const DEFAULT_API_PORT: u16 = 8080;

/// Container host names that only resolve inside the compose network
const INTERNAL_HOSTS: [&str; 2] = ["backend", "frontend"];

/// Where API requests are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    /// Path prefix on the page's own origin, e.g. "/proxy"
    Relative(String),
    Absolute(Url),
}

impl ApiBase {
    /// Absolute URL for `path` (which starts with "/") under this base
    pub fn endpoint(&self, page: &Url, path: &str) -> Result<Url, ClientError> {
        let joined = match self {
            ApiBase::Relative(prefix) => {
                page.join(&format!("{}{}", prefix.trim_end_matches('/'), path))
            }
            ApiBase::Absolute(base) => {
                Url::parse(&format!("{}{}", base.as_str().trim_end_matches('/'), path))
            }
        };
        joined.map_err(|e| ClientError::InvalidUrl(format!("{path}: {e}")))
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiBase::Relative(prefix) => f.write_str(prefix),
            ApiBase::Absolute(url) => f.write_str(url.as_str()),
        }
    }
}

fn default_base(page: &Url) -> ApiBase {
    let mut base = page.clone();
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    if base.set_port(Some(DEFAULT_API_PORT)).is_err() {
        warn!("Page URL {} cannot carry a port, using it as the API base", page);
    }
    ApiBase::Absolute(base)
}

/// Pick the API base from an optional override and the page the client runs on.
///
/// A leading "/" keeps the override relative to the page. Anything else is
/// parsed against the page's scheme and host, with the compose service names
/// swapped for the page host. Unusable overrides fall back to the page host on
/// port 8080.
pub fn resolve_api_base(override_value: Option<&str>, page: &Url) -> ApiBase {
    let Some(raw) = override_value.map(str::trim).filter(|v| !v.is_empty()) else {
        return default_base(page);
    };

    if raw.starts_with('/') {
        return ApiBase::Relative(raw.to_string());
    }

    let page_host = page.host_str().unwrap_or_default();
    let parsed = Url::parse(&format!("{}://{}", page.scheme(), page_host))
        .and_then(|root| root.join(raw));
    let mut url = match parsed {
        Ok(url) => url,
        Err(e) => {
            warn!("Ignoring unparseable API base '{}': {}", raw, e);
            return default_base(page);
        }
    };

    if url.host_str().is_some_and(|h| INTERNAL_HOSTS.contains(&h)) {
        debug!("Swapping internal host {:?} for {}", url.host_str(), page_host);
        if url.set_host(Some(page_host)).is_err() {
            return default_base(page);
        }
        if url.port().is_none() && url.set_port(Some(DEFAULT_API_PORT)).is_err() {
            return default_base(page);
        }
    }

    if page.scheme() == "https" && url.host_str() == Some(page_host) && url.scheme() != "https" {
        // set_scheme only fails between special and non-special schemes
        let _ = url.set_scheme("https");
    }

    ApiBase::Absolute(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    fn absolute(base: ApiBase) -> String {
        match base {
            ApiBase::Absolute(url) => url.to_string(),
            other => panic!("expected absolute base, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_page_host_on_8080() {
        let page = page("http://localhost:5173/insights?city=paris");
        assert_eq!(absolute(resolve_api_base(None, &page)), "http://localhost:8080/");
        assert_eq!(absolute(resolve_api_base(Some("   "), &page)), "http://localhost:8080/");
    }

    #[test]
    fn test_relative_override_is_kept() {
        let page = page("http://example.com");
        assert_eq!(
            resolve_api_base(Some(" /proxy "), &page),
            ApiBase::Relative("/proxy".to_string())
        );
    }

    #[test]
    fn test_absolute_override_is_used() {
        let page = page("http://example.com");
        assert_eq!(
            absolute(resolve_api_base(Some("http://api.other.org:9000"), &page)),
            "http://api.other.org:9000/"
        );
    }

    #[test]
    fn test_internal_hosts_are_swapped() {
        let page = page("http://example.com");
        assert_eq!(
            absolute(resolve_api_base(Some("http://backend:8080"), &page)),
            "http://example.com:8080/"
        );
        assert_eq!(
            absolute(resolve_api_base(Some("http://frontend"), &page)),
            "http://example.com:8080/"
        );
        assert_eq!(
            absolute(resolve_api_base(Some("http://backend:9090"), &page)),
            "http://example.com:9090/"
        );
    }

    #[test]
    fn test_https_page_upgrades_same_host() {
        let page = page("https://example.com");
        assert_eq!(
            absolute(resolve_api_base(Some("http://backend:8080"), &page)),
            "https://example.com:8080/"
        );
        assert_eq!(
            absolute(resolve_api_base(Some("http://api.other.org"), &page)),
            "http://api.other.org/"
        );
        assert_eq!(absolute(resolve_api_base(None, &page)), "https://example.com:8080/");
    }

    #[test]
    fn test_unparseable_override_falls_back() {
        let page = page("http://example.com");
        assert_eq!(
            absolute(resolve_api_base(Some("http://[not-a-host"), &page)),
            "http://example.com:8080/"
        );
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let page = page("http://example.com:3000/app");
        let relative = ApiBase::Relative("/proxy/".to_string());
        assert_eq!(
            relative.endpoint(&page, "/api/aqi").unwrap().as_str(),
            "http://example.com:3000/proxy/api/aqi"
        );

        let absolute = resolve_api_base(Some("http://api.example.com/v2/"), &page);
        assert_eq!(
            absolute.endpoint(&page, "/api/advice").unwrap().as_str(),
            "http://api.example.com/v2/api/advice"
        );
    }
}
