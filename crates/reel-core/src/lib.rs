//! Core types and traits for the Reel recording engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions shared by the log and session layers:
//! typed counters, the input [`Event`] sum type, the [`GameMode`] tag,
//! and the [`Simulation`] collaborator trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod event;
pub mod id;
pub mod mode;
pub mod traits;

pub use event::{Event, KeyCode};
pub use id::{DrawCount, TurnId};
pub use mode::GameMode;
pub use traits::Simulation;
