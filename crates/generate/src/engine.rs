#![forbid(unsafe_code)]

use std::path::Path;

use rand_chacha::ChaCha8Rng;

use crate::config::GenConfig;
use crate::sampling;

/// Errors surfaced by an engine step.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    /// The engine failed to execute the step.
    #[error("engine step failed: {0}")]
    Engine(String),
    /// The engine returned an output tensor with no elements.
    #[error("engine returned an empty output tensor")]
    EmptyOutput,
    /// The step exceeded the configured timeout.
    #[error("engine step timed out")]
    TimedOut,
    /// The engine worker is gone (a previous timeout or a panic).
    #[error("engine worker disconnected")]
    Disconnected,
}

/// Errors while loading a model artifact into the reference engine.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    /// The artifact could not be read.
    #[error("failed to read model artifact: {0}")]
    Read(#[from] std::io::Error),
    /// The artifact holds fewer values than the declared dimensions need.
    #[error("model artifact truncated: have {have} f32 values, need {need}")]
    Truncated {
        /// Values present in the artifact.
        have: usize,
        /// Values the declared dimensions require.
        need: usize,
    },
}

/// Single-step inference seam: one named input (the context window), one
/// named output (a tensor whose first element is the produced token id).
pub trait Engine: Send {
    /// Run one forward step over the current window.
    fn run(&mut self, input: &[i32]) -> Result<Vec<i32>, InferenceError>;
}

/// Dense layer: out = W*in + b, weights row-major (out_dim x in_dim).
#[derive(Debug)]
struct Linear {
    in_dim: usize,
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl Linear {
    /// Carve a layer out of a raw f32 buffer laid out as weights then bias.
    fn from_raw(in_dim: usize, out_dim: usize, raw: &[f32]) -> Self {
        let expected = in_dim * out_dim;
        let mut weights = vec![0.0_f32; expected];
        for (w, v) in weights.iter_mut().zip(raw.iter()) {
            *w = *v;
        }
        let mut bias = vec![0.0_f32; out_dim];
        for (b, v) in bias.iter_mut().zip(raw.iter().skip(expected)) {
            *b = *v;
        }
        Self { in_dim, weights, bias }
    }

    fn forward(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks(self.in_dim)
            .zip(self.bias.iter())
            .map(|(row, b)| {
                row.iter().zip(input.iter()).map(|(w, x)| w * x).sum::<f32>() + b
            })
            .collect()
    }
}

/// Reference engine: a tiny two-layer MLP read from a little-endian `f32`
/// weight blob laid out as `w1, b1, w2, b2`. The forward pass normalizes
/// the window ids, applies embed -> hidden (tanh) -> vocab logits, then
/// samples the next id from the softmaxed logits with a seeded RNG.
#[derive(Debug)]
pub struct Session {
    lin1: Linear,
    lin2: Linear,
    vocab: usize,
    rng: ChaCha8Rng,
}

impl Session {
    /// Load a weight blob and build the session. The blob must hold at
    /// least `context_len*hidden + hidden + hidden*vocab + vocab` values.
    pub fn open(
        path: impl AsRef<Path>,
        vocab: usize,
        cfg: &GenConfig,
    ) -> Result<Self, ModelLoadError> {
        let floats = load_f32_blob(path)?;
        let need1 = cfg.context_len * cfg.hidden + cfg.hidden;
        let need2 = cfg.hidden * vocab + vocab;
        if floats.len() < need1 + need2 {
            return Err(ModelLoadError::Truncated {
                have: floats.len(),
                need: need1 + need2,
            });
        }
        let (raw1, raw2) = floats.split_at(need1);
        let lin1 = Linear::from_raw(cfg.context_len, cfg.hidden, raw1);
        let lin2 = Linear::from_raw(cfg.hidden, vocab, raw2);
        tracing::info!(
            values = floats.len(),
            vocab,
            hidden = cfg.hidden,
            "model artifact loaded"
        );
        Ok(Self {
            lin1,
            lin2,
            vocab,
            rng: sampling::make_rng(cfg.seed),
        })
    }
}

impl Engine for Session {
    fn run(&mut self, input: &[i32]) -> Result<Vec<i32>, InferenceError> {
        if input.len() != self.lin1.in_dim {
            return Err(InferenceError::Engine(format!(
                "input length {} does not match context size {}",
                input.len(),
                self.lin1.in_dim
            )));
        }
        // normalize ids into [0, 1) so the dense layers see bounded inputs
        let scale = self.vocab.max(1) as f32;
        let emb: Vec<f32> = input.iter().map(|&id| id as f32 / scale).collect();
        let hidden: Vec<f32> = self.lin1.forward(&emb).into_iter().map(f32::tanh).collect();
        let mut logits = self.lin2.forward(&hidden);
        sampling::softmax(&mut logits);
        let idx = sampling::sample_index(&logits, &mut self.rng);
        Ok(vec![idx as i32])
    }
}

/// Read a file of little-endian `f32` values.
fn load_f32_blob(path: impl AsRef<Path>) -> Result<Vec<f32>, ModelLoadError> {
    let bytes = std::fs::read(path)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|b| {
            let mut le = [0u8; 4];
            le.copy_from_slice(b);
            f32::from_le_bytes(le)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_cfg() -> GenConfig {
        GenConfig {
            context_len: 4,
            hidden: 3,
            ..GenConfig::default()
        }
    }

    fn blob(values: usize) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        for i in 0..values {
            f.write_all(&(i as f32 * 0.01).to_le_bytes()).unwrap();
        }
        f.flush().unwrap();
        f
    }

    // context 4, hidden 3, vocab 2 => 4*3+3 + 3*2+2 = 23 values
    const NEEDED: usize = 23;

    #[test]
    fn missing_artifact_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Session::open(dir.path().join("absent.bin"), 2, &tiny_cfg()).unwrap_err();
        assert!(matches!(err, ModelLoadError::Read(_)));
    }

    #[test]
    fn short_artifact_is_truncated() {
        let f = blob(NEEDED - 1);
        let err = Session::open(f.path(), 2, &tiny_cfg()).unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::Truncated { have: 22, need: 23 }
        ));
    }

    #[test]
    fn run_produces_a_single_token_in_vocab_range() {
        let f = blob(NEEDED);
        let mut s = Session::open(f.path(), 2, &tiny_cfg()).unwrap();
        let out = s.run(&[0, 0, 0, 0]).unwrap();
        assert_eq!(out.len(), 1);
        let id = *out.first().unwrap();
        assert!((0..2).contains(&id));
    }

    #[test]
    fn same_seed_gives_same_first_token() {
        let f = blob(NEEDED);
        let mut a = Session::open(f.path(), 2, &tiny_cfg()).unwrap();
        let mut b = Session::open(f.path(), 2, &tiny_cfg()).unwrap();
        assert_eq!(a.run(&[0, 0, 0, 0]).unwrap(), b.run(&[0, 0, 0, 0]).unwrap());
    }

    #[test]
    fn wrong_input_shape_is_an_engine_error() {
        let f = blob(NEEDED);
        let mut s = Session::open(f.path(), 2, &tiny_cfg()).unwrap();
        assert!(matches!(s.run(&[0, 0]), Err(InferenceError::Engine(_))));
    }
}
