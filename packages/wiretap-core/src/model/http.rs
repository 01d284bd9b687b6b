//! HTTP recording model, used by the HTTP→mock converter.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Multi-valued header/query-parameter map, keyed case-sensitively as captured.
pub type MultiMap = BTreeMap<String, Vec<String>>;

/// A single captured HTTP request/response pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRecording {
    pub method: String,
    pub url: String,
    pub path: String,
    pub host: String,
    pub scheme: String,
    pub request_headers: MultiMap,
    #[serde(with = "bytes_as_base64")]
    pub request_body: Vec<u8>,
    pub status: u16,
    pub response_headers: MultiMap,
    #[serde(with = "bytes_as_base64")]
    pub response_body: Vec<u8>,
    pub duration_ms: u64,
}

/// A session owns the ordered collection of HTTP recordings captured on one
/// logical connection/crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSession {
    pub recordings: Vec<HttpRecording>,
}

mod bytes_as_base64 {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HttpRecording {
        HttpRecording {
            method: "GET".into(),
            url: "https://api.example.com/v1/users/42".into(),
            path: "/v1/users/42".into(),
            host: "api.example.com".into(),
            scheme: "https".into(),
            request_headers: MultiMap::new(),
            request_body: vec![],
            status: 200,
            response_headers: MultiMap::new(),
            response_body: b"{\"ok\":true}".to_vec(),
            duration_ms: 42,
        }
    }

    #[test]
    fn round_trips_through_json_with_base64_body() {
        let rec = sample();
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"responseBody\""));
        let back: HttpRecording = serde_json::from_str(&json).unwrap();
        assert_eq!(back.response_body, rec.response_body);
        assert_eq!(back.status, 200);
    }

    #[test]
    fn session_holds_ordered_recordings() {
        let mut session = HttpSession::default();
        session.recordings.push(sample());
        session.recordings.push(sample());
        assert_eq!(session.recordings.len(), 2);
    }
}
