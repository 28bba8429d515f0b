//! Session control for deterministic recording and replay.
//!
//! [`Session`] owns the record/playback/out-of-sync state machine on
//! top of the `reel-log` wire layer: the version compatibility gate,
//! per-turn determinism checkpoints, pause/resume, forward-only
//! seeking, and the one-time playback-to-live transition.
//!
//! The engine holds no global state; the caller passes its
//! [`Session`] and its [`Simulation`](reel_core::Simulation)
//! implementation into every call.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod annotate;
pub mod config;
pub mod error;
pub mod guard;
pub mod session;
pub mod version;

pub use annotate::{Annotation, AnnotationReader};
pub use config::{ConfigError, SessionConfig};
pub use error::SessionError;
pub use guard::{DeterminismGuard, OosReport};
pub use session::{SeekOutcome, SeekTarget, Session, SessionState};
pub use version::{Version, VersionCompat};
