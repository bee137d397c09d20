//! rime-bridge-core
//!
//! Session and context bridge between the Rime input method engine and an
//! editor host. The engine is reached through the narrow `RimeApi` trait;
//! everything it hands back is copied into owned values and returned to it
//! before a call completes.
//!
//! Public API:
//! - `RimeApi` - The engine entry points the bridge uses
//! - `RimeHandle` - Owner of the engine and the current session
//! - `Context` - Detached snapshot of composition, menu and commit preview
//! - `SchemaEntry` - One installed schema
//! - `Bridge` - Named host operations over a locked handle
//! - `Value` - Host value tree produced at the boundary
//! - `BridgeConfig` - Distribution metadata and loader hints
//! - `MockRime` - In-memory engine for tests and demos

pub mod ffi;

pub mod api;
pub use api::RimeApi;

pub mod error;
pub use error::{BridgeError, Result};

pub mod config;
pub use config::{BridgeConfig, TraitsRecord};

pub mod marshal;
pub use marshal::{host_to_native, native_to_host, string_length};

pub mod snapshot;
pub use snapshot::{split_at_cursor, Candidate, Composition, Context, Menu};

pub mod handle;
pub use handle::RimeHandle;

pub mod dispatch;

pub mod schema;
pub use schema::SchemaEntry;

pub mod value;
pub use value::Value;

pub mod host;
pub use host::{operations, Bridge, Operation};

pub mod mock;
pub use mock::{MockRime, MockStats};
