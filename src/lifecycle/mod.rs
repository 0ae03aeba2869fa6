//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listener stops accepting, in-flight requests finish
//!             → health probers exit → applier drains and exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
