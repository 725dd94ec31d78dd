#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
#![deny(missing_docs, unused_must_use)]

//! Autoregressive character generation over a fixed context window.
//!
//! A loaded model is driven one step at a time: the current window of the
//! most recent token ids goes in, one token id comes out, the window shifts
//! and the decoded character streams to the caller. The model itself sits
//! behind the [`engine::Engine`] seam; a small reference session reading a
//! little-endian `f32` weight blob keeps the demo self-contained.
//!
//! Layout (important files):
//! - `config.rs` — named generation constants (`GenConfig`)
//! - `window.rs` — fixed-length context window (shift register)
//! - `sampling.rs` — softmax and RNG helpers
//! - `engine.rs` — engine seam + reference `Session`
//! - `adapter.rs` — engine worker thread with a per-step timeout
//! - `controller.rs` — `Generator` state machine driving the loop
//! - `bin/gui.rs` — eframe app: one button, one streaming text surface

/// Named generation constants and the settings file loader.
pub mod config;
/// Fixed-length sliding input buffer.
pub mod window;
/// Softmax and RNG helpers used by the reference engine.
pub mod sampling;
/// Engine seam and the reference weight-blob session.
pub mod engine;
/// Worker-thread adapter imposing a per-step timeout.
pub mod adapter;
/// Generation loop controller.
pub mod controller;

pub use config::GenConfig;
pub use controller::{CancelHandle, GenerateError, Generator, Outcome, RunSummary};
pub use engine::{Engine, InferenceError, ModelLoadError, Session};
pub use window::ContextWindow;
