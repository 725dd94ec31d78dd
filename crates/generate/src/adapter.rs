#![forbid(unsafe_code)]

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::engine::{Engine, InferenceError};
use crate::window::ContextWindow;

/// Owns an [`Engine`] on a dedicated thread and imposes a per-step timeout.
///
/// A stuck engine call would otherwise block the generation loop forever.
/// After a timeout the worker is poisoned: the late reply (if it ever
/// arrives) is discarded and further steps fail with `Disconnected`.
pub struct EngineWorker {
    requests: Sender<Vec<i32>>,
    replies: Receiver<Result<Vec<i32>, InferenceError>>,
    timeout: Duration,
    poisoned: bool,
}

impl EngineWorker {
    /// Move `engine` onto its own thread. The thread exits when the worker
    /// is dropped and the request channel closes.
    pub fn spawn<E: Engine + 'static>(mut engine: E, timeout: Duration) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<Vec<i32>>();
        let (rep_tx, rep_rx) = mpsc::channel();
        thread::spawn(move || {
            while let Ok(input) = req_rx.recv() {
                if rep_tx.send(engine.run(&input)).is_err() {
                    break;
                }
            }
        });
        Self {
            requests: req_tx,
            replies: rep_rx,
            timeout,
            poisoned: false,
        }
    }

    /// Submit the window as the engine's sole input and extract the first
    /// element of its sole output as the produced token id.
    pub fn step(&mut self, window: &ContextWindow) -> Result<i32, InferenceError> {
        if self.poisoned {
            return Err(InferenceError::Disconnected);
        }
        if self.requests.send(window.as_slice().to_vec()).is_err() {
            self.poisoned = true;
            return Err(InferenceError::Disconnected);
        }
        match self.replies.recv_timeout(self.timeout) {
            Ok(Ok(output)) => output.first().copied().ok_or(InferenceError::EmptyOutput),
            Ok(Err(e)) => Err(e),
            Err(RecvTimeoutError::Timeout) => {
                // a late reply would desynchronize request/reply pairing
                self.poisoned = true;
                Err(InferenceError::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.poisoned = true;
                Err(InferenceError::Disconnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<i32>);

    impl Engine for Fixed {
        fn run(&mut self, _input: &[i32]) -> Result<Vec<i32>, InferenceError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl Engine for Failing {
        fn run(&mut self, _input: &[i32]) -> Result<Vec<i32>, InferenceError> {
            Err(InferenceError::Engine("boom".into()))
        }
    }

    struct Sleepy(Duration);

    impl Engine for Sleepy {
        fn run(&mut self, _input: &[i32]) -> Result<Vec<i32>, InferenceError> {
            thread::sleep(self.0);
            Ok(vec![0])
        }
    }

    #[test]
    fn step_takes_first_element_of_output() {
        let mut w = EngineWorker::spawn(Fixed(vec![42, 9]), Duration::from_secs(1));
        assert_eq!(w.step(&ContextWindow::new(4)).unwrap(), 42);
    }

    #[test]
    fn empty_output_is_rejected() {
        let mut w = EngineWorker::spawn(Fixed(vec![]), Duration::from_secs(1));
        assert!(matches!(
            w.step(&ContextWindow::new(4)),
            Err(InferenceError::EmptyOutput)
        ));
    }

    #[test]
    fn engine_errors_propagate() {
        let mut w = EngineWorker::spawn(Failing, Duration::from_secs(1));
        assert!(matches!(
            w.step(&ContextWindow::new(4)),
            Err(InferenceError::Engine(_))
        ));
    }

    #[test]
    fn slow_step_times_out_and_poisons_the_worker() {
        let mut w = EngineWorker::spawn(Sleepy(Duration::from_millis(200)), Duration::from_millis(10));
        assert!(matches!(
            w.step(&ContextWindow::new(4)),
            Err(InferenceError::TimedOut)
        ));
        assert!(matches!(
            w.step(&ContextWindow::new(4)),
            Err(InferenceError::Disconnected)
        ));
    }
}
