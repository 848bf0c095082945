//! # PLC Tag Client
//!
//! A Rust library for exchanging typed data with Allen-Bradley style PLCs
//! through a tag engine such as libplctag.
//!
//! A controller variable is reached through a *tag*: a handle created from a
//! connection descriptor, backed by a local byte buffer. Reads refresh the
//! buffer from the controller, writes push it back, and typed accessors pick
//! values out of it at byte offsets.
//!
//! ## Features
//!
//! - **Engine-agnostic** - the core only talks to the [`TagEngine`] trait
//! - **Owned handles** - a [`TagHandle`] is consumed by `destroy`, so it cannot be used afterwards
//! - **Scoped teardown** - a [`TagRegistry`] destroys every handle exactly once, on every exit path
//! - **Strings** - length-prefixed controller strings via the [`string`] codec
//! - **Poll loop** - read, compute, write cycles with cooperative shutdown
//! - **Simulation** - [`SimulatedEngine`] with fault injection, for tests and dry runs
//!
//! ## Quick Start
//!
//! ```
//! use plctag_client::{
//!     ConnectionConfig, ModbotRule, Poller, ShutdownToken, SimulatedEngine, TagRegistry,
//! };
//!
//! fn main() -> plctag_client::Result<()> {
//!     let mut engine = SimulatedEngine::new();
//!     let config = ConnectionConfig::new("10.206.1.39");
//!
//!     // Create every tag up front; any failure releases the ones already created.
//!     let registry = TagRegistry::open_all(&mut engine, &config, &ModbotRule::tag_specs())?;
//!
//!     let report = Poller::new(registry, ModbotRule::new(), ShutdownToken::new())
//!         .with_max_cycles(3)
//!         .run()?;
//!     assert_eq!(report.cycles, 3);
//!     assert_eq!(report.destroyed, 6);
//!     Ok(())
//! }
//! ```
//!
//! ## Tag Kinds
//!
//! | Kind | Controller type | Element size |
//! |------|-----------------|-------------:|
//! | [`TagKind::U8`] | SINT / BOOL | 1 |
//! | [`TagKind::U16`] | UINT | 2 |
//! | [`TagKind::I16`] | INT | 2 |
//! | [`TagKind::I32`] | DINT | 4 |
//! | [`TagKind::U32`] | UDINT | 4 |
//! | [`TagKind::F32`] | REAL | 4 |
//! | [`TagKind::String`] | STRING | 88 |
//!
//! ## Connection Descriptors
//!
//! ```
//! use plctag_client::{ConnectionConfig, ControllerFamily};
//!
//! let config = ConnectionConfig::new("10.0.0.1").with_cpu(ControllerFamily::Logix);
//! let descriptor = config.descriptor("Mode", 2, 1)?;
//! assert!(descriptor.as_str().starts_with("protocol=ab-eip&gateway=10.0.0.1"));
//! # Ok::<(), plctag_client::TagError>(())
//! ```
//!
//! [`ConnectionConfig::from_env`] reads the same settings from `PLCTAG_*`
//! environment variables.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`], with [`TagError`] carrying
//! the tag name, the operation and the engine status code:
//!
//! ```
//! use plctag_client::{ConnectionConfig, SimulatedEngine, StatusCode, TagError, TagKind, TagRegistry, TagSpec};
//!
//! let mut engine = SimulatedEngine::new();
//! engine.fail_create("Mode", StatusCode::ERR_BAD_GATEWAY);
//!
//! let specs = [TagSpec::new("Mode", TagKind::U16)];
//! match TagRegistry::open_all(&mut engine, &ConnectionConfig::default(), &specs) {
//!     Err(TagError::Create { tag, code, .. }) => {
//!         assert_eq!(tag, "Mode");
//!         assert_eq!(code, StatusCode::ERR_BAD_GATEWAY);
//!     }
//!     other => panic!("unexpected: {other:?}"),
//! };
//! ```
//!
//! ## Logging
//!
//! The library logs through the [`log`] facade: tag lifecycle at `info`,
//! per-cycle values at `debug`, failures at `error`. Install any logger to
//! see it; the `modbot` binary uses `env_logger`.
//!
//! ## Cargo Features
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `libplctag` | `LibPlcTag` engine, links against the libplctag C library |
//! | `serde` | `Serialize`/`Deserialize` for configuration and value types |

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod descriptor;
mod engine;
mod error;
#[cfg(feature = "libplctag")]
mod ffi;
mod poll;
mod registry;
mod sim;
pub mod string;
mod value;

// Public re-exports
pub use descriptor::{
    ConnectionConfig, ControllerFamily, Protocol, TagDescriptor, DEFAULT_DEBUG_LEVEL,
    DEFAULT_GATEWAY, DEFAULT_PATH, DEFAULT_TIMEOUT,
};
pub use engine::{StatusCode, TagEngine, TagHandle};
pub use error::{Operation, Result, TagError};
#[cfg(feature = "libplctag")]
pub use ffi::LibPlcTag;
pub use poll::{ModbotRule, PollReport, PollState, Poller, ShutdownToken, Snapshot, UpdateRule};
pub use registry::{TagEntry, TagRegistry, TagSpec};
pub use sim::{SimOperation, SimulatedEngine};
pub use value::{TagKind, TagValue};
