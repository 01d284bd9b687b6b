//! wiretap-core - shared library for Wiretap.
//!
//! This crate provides the stream recording, storage, and replay engine
//! used by proxy adapters to capture HTTP, WebSocket, and Server-Sent Event
//! traffic as durable recordings, replay those recordings back to clients
//! under three timing disciplines, and convert recordings into mock-server
//! configurations.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`model`]: The `StreamRecording` value type and its protocol payloads
//! - [`store`]: `FileStore` - session lifecycle, persistence, quota, listing
//! - [`hooks`]: Bridges live protocol capture into a store session
//! - [`replay`]: `ReplayController` and its three replay modes
//! - [`convert`]: Recording → mock-config conversion (stream and HTTP)
//! - [`runtime`]: Task spawning abstraction for async runtime independence
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks
//! - [`RecordingHook`](hooks::RecordingHook): Bridging a live capture into a store session
//!
//! Each trait has a default implementation suitable for a standalone server;
//! callers embedding this crate in another runtime may supply their own.

#![warn(clippy::all)]

pub mod clock;
pub mod convert;
pub mod error;
pub mod hooks;
pub mod id;
pub mod model;
pub mod replay;
pub mod runtime;
pub mod store;

pub use error::{ConvertError, ErrorCode, ReplayError, StoreError, ValidationError};
pub use hooks::{
    FileStoreSseHook, FileStoreWebSocketHook, RecordingHook, SseHook, SseHookManager,
    WebSocketHook, WebSocketHookManager,
};
pub use id::RecordingId;
pub use model::{
    Direction, HttpRecording, HttpSession, MessageType, MultiMap, Protocol, ProtocolPayload,
    RecordingMetadata, RecordingStats, RecordingSummary, SseEvent, SsePayload, Status,
    StreamRecording, SyncStatus, WebSocketFrame, WebSocketPayload, WsFrameInput,
};
pub use replay::{
    AdvanceRequest, AdvanceResponse, ReplayConfig, ReplayController, ReplayFrame, ReplayMode,
    ReplaySession, ReplayStatus, SendCallback,
};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use store::{ActiveSessionInfo, ExportFormat, FileStore, ListFilter, StorageConfig, StoreStats};
