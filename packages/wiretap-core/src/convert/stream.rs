//! `ConvertStreamRecording`: projects a WebSocket or SSE recording into a
//! mock-server scenario/event configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConvertError;
use crate::model::{Direction, MessageType, Protocol, ProtocolPayload, StreamRecording};

/// Options controlling timing and content simplification during conversion.
#[derive(Debug, Clone)]
pub struct StreamConvertOptions {
    /// Emit `expect` steps for client-to-server WebSocket frames.
    pub include_client_messages: bool,
    /// Clamp small/large inter-step delays instead of replaying them exactly.
    pub simplify_timing: bool,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Drop consecutive frames/events carrying the same raw payload.
    pub deduplicate_messages: bool,
    /// Default timeout attached to generated `expect` steps, in milliseconds.
    pub expect_timeout_ms: u64,
}

impl Default for StreamConvertOptions {
    fn default() -> Self {
        Self {
            include_client_messages: true,
            simplify_timing: false,
            min_delay_ms: 50,
            max_delay_ms: 5_000,
            deduplicate_messages: false,
            expect_timeout_ms: 30_000,
        }
    }
}

/// A message's content, preserving structure when the raw payload parses as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageValue {
    Json(Value),
    Text(String),
    /// Base64-encoded binary payload.
    Binary(String),
}

impl MessageValue {
    fn from_text(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw.to_string()),
        }
    }

    fn raw_key(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text(text) => text.clone(),
            Self::Binary(b64) => b64.clone(),
        }
    }
}

/// One step in a converted WebSocket scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScenarioStep {
    Send {
        message_type: &'static str,
        value: MessageValue,
        delay_ms: u64,
    },
    Expect {
        message_type: &'static str,
        value: MessageValue,
        timeout_ms: u64,
    },
}

/// A converted WebSocket scenario: a named, ordered list of send/expect steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    pub name: String,
    pub steps: Vec<ScenarioStep>,
}

/// One event in a converted SSE configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseConvertedEvent {
    pub event_type: String,
    pub data: MessageValue,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SseLifecycle {
    pub max_events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SseResume {
    pub enabled: bool,
    pub buffer_size: usize,
}

/// A converted SSE configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseConvertConfig {
    pub events: Vec<SseConvertedEvent>,
    /// Per-event delay relative to the previous event, in milliseconds.
    /// Empty when `fixed_delay` is set instead.
    pub per_event_delays: Vec<u64>,
    /// Set only when `simplify_timing` collapses per-event delays to a mean.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_delay: Option<u64>,
    pub lifecycle: SseLifecycle,
    pub resume: SseResume,
}

/// Metadata describing the source recording, returned alongside every
/// converted config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertMetadata {
    pub source_id: String,
    pub protocol: Protocol,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    pub item_count: usize,
    pub total_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_template: Option<String>,
}

/// A `ConvertStreamRecording` result: the mode-specific config plus metadata.
#[derive(Debug, Clone)]
pub enum StreamConvertResult {
    Scenario(ScenarioConfig),
    Sse(SseConvertConfig),
}

fn metadata_for(recording: &StreamRecording, item_count: usize) -> ConvertMetadata {
    ConvertMetadata {
        source_id: recording.id.to_string(),
        protocol: recording.protocol(),
        original_path: recording.metadata.path.clone(),
        recorded_at: recording.start_time,
        item_count,
        total_duration_ms: recording.duration_ms,
        detected_template: recording.metadata.detected_template.clone(),
    }
}

fn clamp_delay(delta_ms: u64, opts: &StreamConvertOptions) -> u64 {
    if !opts.simplify_timing {
        return delta_ms;
    }
    if delta_ms < opts.min_delay_ms {
        0
    } else if delta_ms > opts.max_delay_ms {
        opts.max_delay_ms
    } else {
        delta_ms
    }
}

/// Converts a recording's stream payload (WebSocket or SSE) into a mock
/// scenario/event configuration.
///
/// # Errors
///
/// [`ConvertError::UnsupportedProtocol`] for `http` recordings.
pub fn convert_stream_recording(
    recording: &StreamRecording,
    options: &StreamConvertOptions,
) -> Result<(StreamConvertResult, ConvertMetadata), ConvertError> {
    match &recording.payload {
        ProtocolPayload::WebSocket(ws) => {
            let mut steps: Vec<ScenarioStep> = Vec::new();
            let mut last_raw: Option<String> = None;
            let mut last_relative_ms: Option<u64> = None;
            let mut last_send_idx: Option<usize> = None;

            for frame in &ws.frames {
                if matches!(
                    frame.message_type,
                    MessageType::Ping | MessageType::Pong | MessageType::Close
                ) {
                    continue;
                }

                let value = match frame.message_type {
                    MessageType::Binary => MessageValue::Binary(frame.data.clone()),
                    _ => MessageValue::from_text(&frame.data),
                };

                if options.deduplicate_messages {
                    let key = value.raw_key();
                    if last_raw.as_deref() == Some(key.as_str()) {
                        continue;
                    }
                    last_raw = Some(key);
                }

                if let Some(prev_ms) = last_relative_ms {
                    let delta = clamp_delay(frame.relative_ms.saturating_sub(prev_ms), options);
                    if let Some(idx) = last_send_idx {
                        if let ScenarioStep::Send { delay_ms, .. } = &mut steps[idx] {
                            *delay_ms = delta;
                        }
                    }
                }
                last_relative_ms = Some(frame.relative_ms);

                let message_type = if matches!(frame.message_type, MessageType::Binary) {
                    "binary"
                } else {
                    "text"
                };

                match frame.direction {
                    Direction::S2c => {
                        steps.push(ScenarioStep::Send {
                            message_type,
                            value,
                            delay_ms: 0,
                        });
                        last_send_idx = Some(steps.len() - 1);
                    }
                    Direction::C2s => {
                        if options.include_client_messages {
                            steps.push(ScenarioStep::Expect {
                                message_type,
                                value,
                                timeout_ms: options.expect_timeout_ms,
                            });
                        }
                        last_send_idx = None;
                    }
                }
            }

            let item_count = ws.frames.len();
            let config = ScenarioConfig {
                name: format!("Recorded: {}", recording.id),
                steps,
            };
            Ok((
                StreamConvertResult::Scenario(config),
                metadata_for(recording, item_count),
            ))
        }
        ProtocolPayload::Sse(sse) => {
            let mut events = Vec::with_capacity(sse.events.len());
            let mut deltas = Vec::with_capacity(sse.events.len());
            let mut prev_ms: Option<u64> = None;
            let mut last_raw: Option<String> = None;

            for event in &sse.events {
                if options.deduplicate_messages {
                    if last_raw.as_deref() == Some(event.data.as_str()) {
                        continue;
                    }
                    last_raw = Some(event.data.clone());
                }
                let delta = match prev_ms {
                    Some(p) => event.relative_ms.saturating_sub(p),
                    None => event.relative_ms,
                };
                deltas.push(delta);
                prev_ms = Some(event.relative_ms);

                events.push(SseConvertedEvent {
                    event_type: event.effective_type().to_string(),
                    data: MessageValue::from_text(&event.data),
                    id: event.id.clone(),
                    comment: event.comment.clone(),
                    retry_ms: event.retry_ms,
                });
            }

            let item_count = events.len();
            let (per_event_delays, fixed_delay) = if options.simplify_timing {
                let mean = if deltas.is_empty() {
                    0
                } else {
                    (deltas.iter().sum::<u64>() as f64 / deltas.len() as f64).round() as u64
                };
                (Vec::new(), Some(mean))
            } else {
                (deltas, None)
            };

            let config = SseConvertConfig {
                events,
                per_event_delays,
                fixed_delay,
                lifecycle: SseLifecycle {
                    max_events: item_count,
                },
                resume: SseResume {
                    enabled: true,
                    buffer_size: item_count,
                },
            };
            Ok((
                StreamConvertResult::Sse(config),
                metadata_for(recording, item_count),
            ))
        }
        ProtocolPayload::Http(_) => Err(ConvertError::UnsupportedProtocol(Protocol::Http)),
    }
}
