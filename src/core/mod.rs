//! Runtime core: wiring and lifecycle.
//!
//! The public API from this module is [`Engine`] and its [`EngineBuilder`].
//!
//! Internal modules:
//! - [`engine`]: owns the broadcaster, control surface and playback task; handles shutdown;
//! - [`builder`]: loads the source, attaches initial subscribers, spawns the loop;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod engine;
mod shutdown;

pub use builder::EngineBuilder;
pub use engine::Engine;
