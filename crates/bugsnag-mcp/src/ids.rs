//! Identifier extraction from resource URIs and Bugsnag dashboard links.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use url::Url;

/// Errors produced while resolving identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// One or more requested segments had no value in the URI
    #[error("not all IDs found in URI: {uri} (missing: {missing})")]
    Extraction { uri: String, missing: String },

    /// The event reference looked like a link but is not a valid URL
    #[error("invalid event link: {0}")]
    InvalidLink(String),

    /// The link has no usable `event_id` query parameter
    #[error("event_id not found in link: {0}")]
    MissingEventId(String),
}

/// Extract IDs from a URI given the segment names that precede them.
///
/// For `bugsnag://projects/123/events/456` and `["projects", "events"]` this
/// returns `{"projects": "123", "events": "456"}`. Every requested segment must
/// be followed by a non-empty token; otherwise the whole extraction fails. When
/// a segment name occurs more than once, the first bound value is kept.
pub fn extract_ids(uri: &str, segments: &[&str]) -> Result<HashMap<String, String>, IdError> {
    let requested: HashSet<&str> = segments.iter().copied().collect();
    let tokens: Vec<&str> = uri.split('/').collect();
    let mut ids = HashMap::with_capacity(requested.len());

    for (i, token) in tokens.iter().enumerate() {
        if !requested.contains(token) || ids.contains_key(*token) {
            continue;
        }
        match tokens.get(i + 1) {
            Some(id) if !id.is_empty() => {
                ids.insert(token.to_string(), id.to_string());
            }
            _ => {}
        }
    }

    if ids.len() < requested.len() {
        let mut missing: Vec<&str> = requested
            .iter()
            .filter(|seg| !ids.contains_key(**seg))
            .copied()
            .collect();
        missing.sort_unstable();
        return Err(IdError::Extraction {
            uri: uri.to_string(),
            missing: missing.join(", "),
        });
    }

    Ok(ids)
}

/// Resolve an event ID from either a bare ID or a Bugsnag dashboard link.
///
/// Links carry the event in their `event_id` query parameter, e.g.
/// `https://app.bugsnag.com/acme/web/errors/abc?event_id=xyz789`. A token with
/// no `/` and no `http(s):` scheme is returned unchanged.
pub fn resolve_event_id(id_or_link: &str) -> Result<String, IdError> {
    if !id_or_link.contains('/') && !has_http_scheme(id_or_link) {
        return Ok(id_or_link.to_string());
    }

    let url = Url::parse(id_or_link)
        .map_err(|e| IdError::InvalidLink(format!("{}: {}", id_or_link, e)))?;

    url.query_pairs()
        .find(|(key, _)| key == "event_id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| IdError::MissingEventId(id_or_link.to_string()))
}

fn has_http_scheme(value: &str) -> bool {
    let starts_with = |prefix: &str| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    starts_with("http:") || starts_with("https:")
}
