//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload config file
//! ```
//!
//! Startup ordering lives in `main.rs`: config, logging, metrics,
//! registry, dispatcher, watcher, then the listener.

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
