//! Converts captured recordings into mock-server configurations: a stream
//! converter (WebSocket/SSE → scenario/event config) and an HTTP converter
//! (request/response pairs → matcher/response mocks, with filtering,
//! deduplication, and a sensitive-data scan).

mod http;
mod stream;

pub use http::{
    convert_http_recording, deduplicate, deduplicate_parameterized, filter_recordings,
    glob_match, parse_status_range_token, scan_sensitive_data, smart_path_matcher, DedupStrategy,
    MockConfig, MockMatcher, MockResponse, RecordingFilter, SensitiveKind, SensitiveLocation,
    SensitiveWarning, StatusRange,
};
pub use stream::{
    convert_stream_recording, ConvertMetadata, MessageValue, ScenarioConfig, ScenarioStep,
    SseConvertConfig, SseConvertedEvent, SseLifecycle, SseResume, StreamConvertOptions,
    StreamConvertResult,
};
