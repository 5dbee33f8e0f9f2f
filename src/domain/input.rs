use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, Uri};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Request metadata handed to the policy engine as `input`.
///
/// Built fresh for every request; nothing is shared between two inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionInput {
    /// Requested URL path, percent-decoded
    pub path: String,

    /// Header name (canonical form) to its last received value
    pub headers: BTreeMap<String, String>,

    /// Host the request was addressed to
    pub host: String,
}

impl DecisionInput {
    /// Build an input from the parts of a live request.
    ///
    /// `Host` is reported through `host` only. When a header repeats, the
    /// last value wins.
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        let mut map = BTreeMap::new();
        for name in headers.keys() {
            if *name == header::HOST {
                continue;
            }
            if let Some(value) = headers.get_all(name).iter().last() {
                map.insert(
                    canonical_header_name(name.as_str()),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                );
            }
        }

        DecisionInput {
            path: percent_decode_str(uri.path())
                .decode_utf8_lossy()
                .into_owned(),
            headers: map,
            host,
        }
    }
}

/// Canonical MIME form of a header name: `x-forwarded-for` -> `X-Forwarded-For`.
///
/// Names containing characters outside the token set are returned unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if !name.bytes().all(is_token_byte) {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}
