#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokenize::{VocabError, Vocabulary};

use crate::adapter::EngineWorker;
use crate::config::GenConfig;
use crate::engine::{Engine, InferenceError};
use crate::window::ContextWindow;

/// Errors that abort or refuse a generation run.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A run is already active; concurrent activations are rejected.
    #[error("a generation run is already active")]
    Busy,
    /// A produced token id could not be decoded.
    #[error(transparent)]
    Vocab(#[from] VocabError),
    /// The engine step failed, timed out or returned a malformed output.
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The configured number of tokens was produced.
    Completed,
    /// The cancel handle fired before the run finished.
    Cancelled,
}

/// Result of a finished (non-aborted) run.
#[derive(Debug, Clone, Copy)]
pub struct RunSummary {
    /// Number of tokens produced and emitted.
    pub produced: usize,
    /// Whether the run completed or was cancelled.
    pub outcome: Outcome,
}

/// Cooperative stop flag for an in-flight run.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a fresh, unsignalled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the active run to stop after the iteration in progress.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once [`CancelHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the handle can guard another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Generation loop controller: one loaded model, reused across
/// activations, with a single active generation context.
///
/// Construct once, run many. The window and the engine worker are owned
/// here rather than captured by a UI closure, and an atomic guard rejects
/// a second activation while a run is active. Construction requires an
/// already-loaded vocabulary and engine, so a failed resource load can
/// never reach the Running state.
pub struct Generator {
    vocab: Arc<Vocabulary>,
    worker: EngineWorker,
    window: ContextWindow,
    cfg: GenConfig,
    running: Arc<AtomicBool>,
}

impl Generator {
    /// Build a controller from loaded resources. The engine moves onto its
    /// worker thread here and stays there for the controller's lifetime.
    pub fn new<E: Engine + 'static>(vocab: Arc<Vocabulary>, engine: E, cfg: GenConfig) -> Self {
        let worker = EngineWorker::spawn(engine, cfg.step_timeout());
        let window = ContextWindow::new(cfg.context_len);
        Self {
            vocab,
            worker,
            window,
            cfg,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared view of the Running/Idle flag, for UI gating.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Settings the controller runs with.
    pub fn config(&self) -> &GenConfig {
        &self.cfg
    }

    /// Run one bounded generation loop, feeding decoded characters to
    /// `sink` as they are produced.
    ///
    /// Rejected with [`GenerateError::Busy`] while another run is active.
    /// The window is reset to zero-valued tokens on entry. Any engine or
    /// decode failure aborts the loop immediately; characters already
    /// emitted stay with the caller.
    pub fn run<F: FnMut(char)>(
        &mut self,
        cancel: &CancelHandle,
        mut sink: F,
    ) -> Result<RunSummary, GenerateError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(GenerateError::Busy);
        }
        let result = self.run_inner(cancel, &mut sink);
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn run_inner<F: FnMut(char)>(
        &mut self,
        cancel: &CancelHandle,
        sink: &mut F,
    ) -> Result<RunSummary, GenerateError> {
        self.window.reset();
        for produced in 0..self.cfg.max_tokens {
            if cancel.is_cancelled() {
                tracing::info!(produced, "generation cancelled");
                return Ok(RunSummary {
                    produced,
                    outcome: Outcome::Cancelled,
                });
            }
            let token = self.worker.step(&self.window)?;
            let glyph = self.vocab.glyph_for(token)?;
            self.window.push(token);
            for ch in glyph.chars() {
                sink(ch);
            }
            // yields the thread between tokens so the host UI stays live
            thread::sleep(self.cfg.token_delay());
        }
        tracing::info!(produced = self.cfg.max_tokens, "generation completed");
        Ok(RunSummary {
            produced: self.cfg.max_tokens,
            outcome: Outcome::Completed,
        })
    }
}
