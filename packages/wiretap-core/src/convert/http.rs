//! HTTP recording → mock-config conversion: matcher/response mapping, the
//! recording filter pipeline, deduplication, the smart path matcher, and the
//! sensitive-data scan.

use crate::model::{HttpRecording, MultiMap};

/// Response headers that vary request-to-request and are excluded from a
/// converted mock response.
const DYNAMIC_RESPONSE_HEADERS: &[&str] = &[
    "date",
    "content-length",
    "transfer-encoding",
    "connection",
    "keep-alive",
    "server",
    "x-powered-by",
    "age",
    "expires",
    "last-modified",
    "etag",
];

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "x-access-token",
    "api-key",
    "apikey",
    "x-csrf-token",
    "x-xsrf-token",
    "proxy-authorization",
];

const COOKIE_PATTERNS: &[&str] = &["session", "token", "auth", "jwt", "sid", "csrf", "xsrf"];

const SENSITIVE_QUERY_PARAMS: &[&str] = &[
    "api_key",
    "apikey",
    "api-key",
    "access_token",
    "token",
    "auth",
    "key",
    "secret",
    "password",
    "passwd",
    "pwd",
];

/// A mock matcher: the request shape a mock server compares incoming
/// requests against.
#[derive(Debug, Clone)]
pub struct MockMatcher {
    pub method: String,
    pub path: String,
    pub request_headers: Option<MultiMap>,
}

/// A mock's canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: MultiMap,
    pub body: Vec<u8>,
}

/// One converted mock: matcher plus the response it should return.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub matcher: MockMatcher,
    pub response: MockResponse,
}

/// Converts a single captured HTTP pair into a mock config, stripping
/// response headers that vary across recordings of the same real request.
#[must_use]
pub fn convert_http_recording(recording: &HttpRecording) -> MockConfig {
    let request_headers = if recording.request_headers.is_empty() {
        None
    } else {
        Some(recording.request_headers.clone())
    };
    let headers = recording
        .response_headers
        .iter()
        .filter(|(name, _)| !DYNAMIC_RESPONSE_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .map(|(name, values)| (name.clone(), values.clone()))
        .collect();

    MockConfig {
        matcher: MockMatcher {
            method: recording.method.clone(),
            path: recording.path.clone(),
            request_headers,
        },
        response: MockResponse {
            status: recording.status,
            headers,
            body: recording.response_body.clone(),
        },
    }
}

/// A canonical status-code bucket used by `status_ranges` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRange {
    R2xx,
    R3xx,
    R4xx,
    R5xx,
}

impl StatusRange {
    fn matches(self, status: u16) -> bool {
        let bucket = status / 100;
        match self {
            Self::R2xx => bucket == 2,
            Self::R3xx => bucket == 3,
            Self::R4xx => bucket == 4,
            Self::R5xx => bucket == 5,
        }
    }
}

/// Parses a status-range token, accepting the canonical `NxxRange` forms and
/// the documented aliases (`success`/`ok`, `client-error`, `server-error`,
/// `error`).
#[must_use]
pub fn parse_status_range_token(token: &str) -> Option<Vec<StatusRange>> {
    match token.to_ascii_lowercase().as_str() {
        "2xx" | "success" | "ok" => Some(vec![StatusRange::R2xx]),
        "3xx" => Some(vec![StatusRange::R3xx]),
        "4xx" | "client-error" => Some(vec![StatusRange::R4xx]),
        "5xx" | "server-error" => Some(vec![StatusRange::R5xx]),
        "error" => Some(vec![StatusRange::R4xx, StatusRange::R5xx]),
        _ => None,
    }
}

/// Parameters for [`filter_recordings`]. Any unset field is a pass-through;
/// all set fields must match for a recording to be kept.
#[derive(Debug, Clone, Default)]
pub struct RecordingFilter {
    /// A glob pattern (`*`, `?`) matched against the recorded path.
    pub path_pattern: Option<String>,
    pub methods: Option<Vec<String>>,
    pub statuses: Option<Vec<u16>>,
    pub status_ranges: Option<Vec<String>>,
}

impl RecordingFilter {
    #[must_use]
    pub fn matches(&self, recording: &HttpRecording) -> bool {
        if let Some(pattern) = &self.path_pattern {
            if !glob_match(pattern, &recording.path) {
                return false;
            }
        }
        if let Some(methods) = &self.methods {
            if !methods
                .iter()
                .any(|m| m.eq_ignore_ascii_case(&recording.method))
            {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&recording.status) {
                return false;
            }
        }
        if let Some(ranges) = &self.status_ranges {
            let ok = ranges.iter().any(|token| {
                parse_status_range_token(token)
                    .is_some_and(|rs| rs.iter().any(|r| r.matches(recording.status)))
            });
            if !ok {
                return false;
            }
        }
        true
    }
}

/// Filters `recordings` against `filter`, keeping original order.
#[must_use]
pub fn filter_recordings<'a>(
    recordings: &'a [HttpRecording],
    filter: &RecordingFilter,
) -> Vec<&'a HttpRecording> {
    recordings.iter().filter(|r| filter.matches(r)).collect()
}

/// A glob match over `*` (any run of characters) and `?` (exactly one
/// character), with fast paths for literal prefix/suffix/substring patterns.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains(['*', '?']) {
        return pattern == text;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        if !prefix.contains(['*', '?']) {
            return text.starts_with(prefix);
        }
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        if !suffix.contains(['*', '?']) {
            return text.ends_with(suffix);
        }
    }
    if pattern.starts_with('*') && pattern.ends_with('*') && pattern.len() >= 2 {
        let middle = &pattern[1..pattern.len() - 1];
        if !middle.contains(['*', '?']) {
            return text.contains(middle);
        }
    }
    glob_match_recursive(pattern.as_bytes(), text.as_bytes())
}

fn glob_match_recursive(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match_recursive(&pattern[1..], text)
                || (!text.is_empty() && glob_match_recursive(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match_recursive(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match_recursive(&pattern[1..], &text[1..]),
        _ => false,
    }
}

/// Deduplication strategy for recordings sharing the same method + path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    #[default]
    First,
    Last,
    All,
}

/// Deduplicates `recordings` by `(method, path)`, honoring `strategy`.
#[must_use]
pub fn deduplicate<'a>(
    recordings: Vec<&'a HttpRecording>,
    strategy: DedupStrategy,
) -> Vec<&'a HttpRecording> {
    dedup_by_key(recordings, strategy, |r| (r.method.clone(), r.path.clone()))
}

/// Deduplicates by `(method, SmartPathMatcher(path))`, for use after
/// parameterizing dynamic path segments.
#[must_use]
pub fn deduplicate_parameterized<'a>(
    recordings: Vec<&'a HttpRecording>,
    strategy: DedupStrategy,
) -> Vec<&'a HttpRecording> {
    dedup_by_key(recordings, strategy, |r| {
        (r.method.clone(), smart_path_matcher(&r.path))
    })
}

fn dedup_by_key<'a>(
    recordings: Vec<&'a HttpRecording>,
    strategy: DedupStrategy,
    key: impl Fn(&HttpRecording) -> (String, String),
) -> Vec<&'a HttpRecording> {
    use std::collections::HashMap;

    if strategy == DedupStrategy::All {
        return recordings;
    }

    let mut order = Vec::new();
    let mut kept: HashMap<(String, String), &HttpRecording> = HashMap::new();
    for recording in recordings {
        let k = key(recording);
        if !kept.contains_key(&k) {
            order.push(k.clone());
        }
        match strategy {
            DedupStrategy::First => {
                kept.entry(k).or_insert(recording);
            }
            DedupStrategy::Last => {
                kept.insert(k, recording);
            }
            DedupStrategy::All => unreachable!(),
        }
    }
    order.into_iter().filter_map(|k| kept.remove(&k)).collect()
}

/// Replaces identifier-shaped path segments with `{id}`: UUIDs, base-10
/// integers, long hex-hash-like tokens (≥16 chars, all hex digits), and
/// long base64-like tokens (≥20 chars, base64 alphabet).
#[must_use]
pub fn smart_path_matcher(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.is_empty() || !looks_like_id(segment) {
                segment.to_string()
            } else {
                "{id}".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_id(segment: &str) -> bool {
    is_uuid(segment)
        || segment.chars().all(|c| c.is_ascii_digit())
        || (segment.len() >= 16 && segment.chars().all(|c| c.is_ascii_hexdigit()))
        || (segment.len() >= 20 && is_base64_like(segment))
}

fn is_uuid(segment: &str) -> bool {
    let parts: Vec<&str> = segment.split('-').collect();
    let expected = [8, 4, 4, 4, 12];
    parts.len() == 5
        && parts
            .iter()
            .zip(expected)
            .all(|(part, len)| part.len() == len && part.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_base64_like(segment: &str) -> bool {
    segment
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '-' || c == '_' || c == '=')
}

/// The kind of sensitive data a scan warning points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveKind {
    Header,
    Cookie,
    Query,
}

/// Where the flagged data was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveLocation {
    Request,
    Response,
}

/// A non-mutating warning emitted by [`scan_sensitive_data`].
#[derive(Debug, Clone)]
pub struct SensitiveWarning {
    pub kind: SensitiveKind,
    pub field: String,
    pub location: SensitiveLocation,
}

/// Scans a recording's headers, cookies, and query parameters for sensitive
/// data, emitting warnings without modifying the recording.
#[must_use]
pub fn scan_sensitive_data(recording: &HttpRecording) -> Vec<SensitiveWarning> {
    let mut warnings = Vec::new();

    scan_headers(
        &recording.request_headers,
        SensitiveLocation::Request,
        &mut warnings,
    );
    scan_headers(
        &recording.response_headers,
        SensitiveLocation::Response,
        &mut warnings,
    );
    scan_cookies(
        &recording.request_headers,
        "cookie",
        SensitiveLocation::Request,
        &mut warnings,
    );
    scan_cookies(
        &recording.response_headers,
        "set-cookie",
        SensitiveLocation::Response,
        &mut warnings,
    );
    scan_query_params(&recording.url, &mut warnings);

    warnings
}

fn scan_headers(headers: &MultiMap, location: SensitiveLocation, out: &mut Vec<SensitiveWarning>) {
    for name in headers.keys() {
        if SENSITIVE_HEADERS.contains(&name.to_ascii_lowercase().as_str()) {
            out.push(SensitiveWarning {
                kind: SensitiveKind::Header,
                field: name.clone(),
                location,
            });
        }
    }
}

fn scan_cookies(
    headers: &MultiMap,
    header_name: &str,
    location: SensitiveLocation,
    out: &mut Vec<SensitiveWarning>,
) {
    let Some(values) = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(header_name))
        .map(|(_, values)| values)
    else {
        return;
    };
    for value in values {
        for cookie_pair in value.split(';') {
            let name = cookie_pair.split('=').next().unwrap_or("").trim();
            let lower = name.to_ascii_lowercase();
            if COOKIE_PATTERNS.iter().any(|p| lower.contains(p)) {
                out.push(SensitiveWarning {
                    kind: SensitiveKind::Cookie,
                    field: name.to_string(),
                    location,
                });
            }
        }
    }
}

fn scan_query_params(url: &str, out: &mut Vec<SensitiveWarning>) {
    let Some((_, query)) = url.split_once('?') else {
        return;
    };
    for pair in query.split('&') {
        let name = pair.split('=').next().unwrap_or("");
        if SENSITIVE_QUERY_PARAMS.contains(&name.to_ascii_lowercase().as_str()) {
            out.push(SensitiveWarning {
                kind: SensitiveKind::Query,
                field: name.to_string(),
                location: SensitiveLocation::Request,
            });
        }
    }
}
