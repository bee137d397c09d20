//! librime-bridge
//!
//! Binds the bridge core to a librime shared library opened at runtime.
//!
//! Public API:
//! - `NativeRime` - `RimeApi` implementation over librime's function table
//! - `load` - Locate and open librime as configured
//! - `handle_line` - One JSON request in, one JSON answer out

pub mod table;
pub use table::RimeApiTable;

pub mod native;
pub use native::NativeRime;

pub mod loader;
pub use loader::{default_library_names, load};

pub mod protocol;
pub use protocol::{handle_line, Request, Response};
