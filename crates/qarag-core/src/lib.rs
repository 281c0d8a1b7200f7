//! # QARAG Core
//!
//! Runtime-free client state for the QARAG document question-answering
//! client: data models, the append-only conversation log, evidence
//! correlation, the ingestion progress state machine, the cached document
//! listing, and panel display rules.
//!
//! This crate performs no I/O and owns no timers. The application crate
//! drives it from network resolutions and timer events.

pub mod conversation;
pub mod display;
pub mod documents;
pub mod evidence;
pub mod ingestion;
pub mod models;
pub mod state;
