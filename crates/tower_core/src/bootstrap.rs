//! One-shot resolution of a tower id into a transport endpoint.
//!
//! The tower page embeds the load-balanced socket server address, the tower
//! display name and the initial bell type in its setup script; none of these
//! are available over the event channel, so they are scraped here before the
//! session connects.

use reqwest::Client;
use serde::Deserialize;
use shared::domain::{BellType, TowerId};
use tracing::debug;
use url::Url;

use crate::error::TowerError;

/// Protocol version this client is written against.
pub const EXPECTED_MAJOR: u64 = 1;
pub const EXPECTED_MINOR: u64 = 0;

#[derive(Debug, Clone, PartialEq)]
pub struct TowerEndpoint {
    /// Address of the socket server, not necessarily the page's own host.
    pub socket_url: String,
    pub tower_name: String,
    pub bell_type: BellType,
}

/// Fetches the tower page and extracts the endpoint fields.
pub async fn resolve(tower_id: TowerId, base_url: &str) -> Result<TowerEndpoint, TowerError> {
    let base = normalize_base_url(base_url);
    let page_url = join_url(&base, &tower_id.0.to_string())?;
    let response = Client::new()
        .get(page_url)
        .send()
        .await
        .map_err(|_| TowerError::Unreachable { url: base.clone() })?;
    if !response.status().is_success() {
        return Err(TowerError::TowerNotFound { tower_id, url: base });
    }
    let html = response
        .text()
        .await
        .map_err(|_| TowerError::Unreachable { url: base.clone() })?;

    let endpoint =
        parse_tower_page(&html).ok_or(TowerError::TowerNotFound { tower_id, url: base })?;
    debug!(
        tower = tower_id.0,
        socket_url = %endpoint.socket_url,
        name = %endpoint.tower_name,
        "resolved tower endpoint"
    );
    Ok(endpoint)
}

/// Checks the remote service's reported protocol version, before any
/// connection is attempted.
pub async fn check_remote_version(base_url: &str) -> Result<(), TowerError> {
    let (major, minor) = fetch_remote_version(base_url).await?;
    if major == EXPECTED_MAJOR && minor >= EXPECTED_MINOR {
        Ok(())
    } else {
        Err(TowerError::IncompatibleVersion {
            remote: format!("{major}.{minor}"),
            expected: format!("{EXPECTED_MAJOR}.{EXPECTED_MINOR}"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    #[serde(rename = "socketio-version")]
    socketio_version: String,
}

/// The `major.minor` pair reported by the service's version endpoint.
pub async fn fetch_remote_version(base_url: &str) -> Result<(u64, u64), TowerError> {
    let base = normalize_base_url(base_url);
    let url = join_url(&base, "api/version")?;
    let response: VersionResponse = Client::new()
        .get(url)
        .send()
        .await
        .map_err(|_| TowerError::Unreachable { url: base.clone() })?
        .error_for_status()
        .map_err(|_| TowerError::Unreachable { url: base.clone() })?
        .json()
        .await
        .map_err(|_| TowerError::Unreachable { url: base })?;

    parse_major_minor(&response.socketio_version).ok_or_else(|| {
        TowerError::IncompatibleVersion {
            remote: response.socketio_version.clone(),
            expected: format!("{EXPECTED_MAJOR}.{EXPECTED_MINOR}"),
        }
    })
}

fn parse_major_minor(semver: &str) -> Option<(u64, u64)> {
    let mut parts = semver.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = match parts.next() {
        None => 0,
        Some(part) => part.trim().parse().ok()?,
    };
    Some((major, minor))
}

fn normalize_base_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn join_url(base: &str, path: &str) -> Result<Url, TowerError> {
    Url::parse(base)
        .and_then(|url| url.join(path))
        .map_err(|_| TowerError::Unreachable {
            url: base.to_string(),
        })
}

fn parse_tower_page(html: &str) -> Option<TowerEndpoint> {
    let socket_url = extract_field(html, "server_ip")?;
    let tower_name = extract_field(html, "tower_name")?;
    let audio = extract_field(html, "audio")?;
    let bell_type = BellType::from_wire_name(&audio).ok()?;
    Some(TowerEndpoint {
        socket_url,
        tower_name,
        bell_type,
    })
}

// The rendered page assigns each field as `key: "value"` in its setup
// script; the values themselves never contain quotes.
fn extract_field(html: &str, key: &str) -> Option<String> {
    let marker = format!("{key}: \"");
    let start = html.find(&marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod parse_tests {
    use super::*;

    #[test]
    fn extracts_fields_from_page_script() {
        let html = r#"
            <script>
                window.tower_parameters = {
                    server_ip: "https://sockets.example.com",
                    tower_name: "Old North",
                    audio: "Tower",
                };
            </script>
        "#;
        let endpoint = parse_tower_page(html).expect("endpoint");
        assert_eq!(endpoint.socket_url, "https://sockets.example.com");
        assert_eq!(endpoint.tower_name, "Old North");
        assert_eq!(endpoint.bell_type, BellType::Tower);
    }

    #[test]
    fn page_without_fields_does_not_parse() {
        assert_eq!(parse_tower_page("<html><body>404</body></html>"), None);
    }

    #[test]
    fn version_strings_parse_leniently() {
        assert_eq!(parse_major_minor("1.0.3"), Some((1, 0)));
        assert_eq!(parse_major_minor("1"), Some((1, 0)));
        assert_eq!(parse_major_minor("2.7"), Some((2, 7)));
        assert_eq!(parse_major_minor("nonsense"), None);
    }

    #[test]
    fn base_urls_gain_a_scheme() {
        assert_eq!(normalize_base_url("ringingroom.com"), "https://ringingroom.com");
        assert_eq!(
            normalize_base_url("http://127.0.0.1:3000"),
            "http://127.0.0.1:3000"
        );
    }
}

#[cfg(test)]
#[path = "tests/bootstrap_tests.rs"]
mod tests;
