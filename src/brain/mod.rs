//! Recurrent neural controller
//!
//! A single-hidden-layer network with recurrent hidden state: the input
//! layer is the perception vector concatenated with the previous hidden
//! state, the hidden layer uses tanh, and the five outputs are raw tanh
//! values in [-1, 1]. The stored hidden state is multiplied by a fixed leak
//! after every forward pass so short-term memory decays instead of
//! saturating.
//!
//! Output convention (canonical): thrust and rotation are consumed as-is;
//! sprint, mate, and attack intents are remapped to [0, 1] by the
//! [`ActionVector`] accessors, never inside the network.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Number of controller outputs
pub const OUTPUT_SIZE: usize = 5;

/// Multiplicative hidden-state leak applied after each forward pass
pub const HIDDEN_LEAK: f32 = 0.9;

/// The five bounded controller outputs for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionVector {
    pub raw: [f32; OUTPUT_SIZE],
}

impl ActionVector {
    /// Forward/backward drive in [-1, 1]
    pub fn thrust(&self) -> f32 {
        self.raw[0]
    }

    /// Turn rate in [-1, 1]
    pub fn rotation(&self) -> f32 {
        self.raw[1]
    }

    /// Continuous sprint intensity in [0, 1]
    pub fn sprint(&self) -> f32 {
        (self.raw[2] + 1.0) / 2.0
    }

    /// Mate-seeking intent in [0, 1]
    pub fn mate_intent(&self) -> f32 {
        (self.raw[3] + 1.0) / 2.0
    }

    /// Attack intent in [0, 1]
    pub fn attack_intent(&self) -> f32 {
        (self.raw[4] + 1.0) / 2.0
    }
}

/// Expected weight-blob length for the given layer sizes
pub fn weight_len(input_size: usize, hidden_size: usize) -> usize {
    (input_size + hidden_size) * hidden_size  // input+recurrent -> hidden
        + hidden_size                         // hidden biases
        + hidden_size * OUTPUT_SIZE           // hidden -> output
        + OUTPUT_SIZE                         // output biases
}

/// Recurrent controller: flat weight blob plus its layer geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brain {
    input_size: usize,
    hidden_size: usize,
    weights: Vec<f32>,
}

impl Brain {
    /// Fresh random weights, uniform in [-0.5, 0.5]
    pub fn new_random(input_size: usize, hidden_size: usize, rng: &mut impl Rng) -> Self {
        let len = weight_len(input_size, hidden_size);
        let weights = (0..len).map(|_| rng.gen_range(-0.5..0.5)).collect();
        Self {
            input_size,
            hidden_size,
            weights,
        }
    }

    /// Build a controller from an inherited weight blob
    ///
    /// A blob of the wrong length (e.g. saved from a different
    /// specialization) is discarded and replaced with fresh random weights.
    /// The returned flag is true when that happened, so callers can stop
    /// reusing the stale blob.
    pub fn from_blob(
        input_size: usize,
        hidden_size: usize,
        blob: Vec<f32>,
        rng: &mut impl Rng,
    ) -> (Self, bool) {
        let expected = weight_len(input_size, hidden_size);
        if blob.len() == expected && blob.iter().all(|w| w.is_finite()) {
            (
                Self {
                    input_size,
                    hidden_size,
                    weights: blob,
                },
                false,
            )
        } else {
            tracing::warn!(
                expected,
                actual = blob.len(),
                "incompatible weight blob, reinitializing with random weights"
            );
            (Self::new_random(input_size, hidden_size, rng), true)
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// One forward pass
    ///
    /// Reads `inputs` and the previous `hidden` state, writes the leaked new
    /// hidden state back into `hidden`, and returns the action vector. A
    /// malformed input or hidden slice degrades to a neutral (all-zero
    /// output) pass rather than failing.
    pub fn forward(&self, inputs: &[f32], hidden: &mut [f32]) -> ActionVector {
        if inputs.len() != self.input_size || hidden.len() != self.hidden_size {
            tracing::warn!(
                inputs = inputs.len(),
                expected_inputs = self.input_size,
                hidden = hidden.len(),
                expected_hidden = self.hidden_size,
                "malformed controller input, emitting neutral action"
            );
            return ActionVector::default();
        }

        let w = &self.weights;
        let (ni, nh) = (self.input_size, self.hidden_size);
        let b1_off = (ni + nh) * nh;
        let w2_off = b1_off + nh;
        let b2_off = w2_off + nh * OUTPUT_SIZE;

        // Hidden activations from perception inputs plus recurrent state
        let mut activations = vec![0.0f32; nh];
        for (h, activation) in activations.iter_mut().enumerate() {
            let mut sum = w[b1_off + h];
            let row = h * (ni + nh);
            for (i, &x) in inputs.iter().enumerate() {
                sum += w[row + i] * x;
            }
            for (j, &r) in hidden.iter().enumerate() {
                sum += w[row + ni + j] * r;
            }
            *activation = sum.tanh();
        }

        let mut raw = [0.0f32; OUTPUT_SIZE];
        for (o, out) in raw.iter_mut().enumerate() {
            let mut sum = w[b2_off + o];
            let row = w2_off + o * nh;
            for (h, &a) in activations.iter().enumerate() {
                sum += w[row + h] * a;
            }
            *out = sum.tanh();
        }

        // Memory decay: keep a leaked copy of the activations as the next
        // tick's recurrent input
        for (slot, a) in hidden.iter_mut().zip(activations.iter()) {
            *slot = a * HIDDEN_LEAK;
        }

        ActionVector { raw }
    }

    /// Perturb each weight independently with Gaussian noise of standard
    /// deviation `rate`, optionally scaled by the agent's fitness
    /// percentile: the top quartile mutates at half strength, the bottom
    /// quartile at 1.5x, linear in between.
    pub fn mutate(&mut self, rate: f32, rng: &mut impl Rng, fitness_percentile: Option<f32>) {
        let effective = rate * percentile_scale(fitness_percentile);
        if effective <= 0.0 {
            return;
        }
        let Ok(noise) = Normal::new(0.0f32, effective) else {
            return;
        };
        for w in &mut self.weights {
            *w += noise.sample(rng);
        }
    }

    /// Fitness-weighted per-weight blend of two parents
    ///
    /// The higher-fitness parent contributes a larger fraction of every
    /// weight. Shape mismatch (different specializations) falls back to a
    /// copy of the fitter parent rather than failing.
    pub fn crossover(a: &Brain, b: &Brain, fitness_a: f32, fitness_b: f32) -> Brain {
        if a.input_size != b.input_size || a.hidden_size != b.hidden_size {
            return if fitness_a >= fitness_b {
                a.clone()
            } else {
                b.clone()
            };
        }

        let fa = fitness_a.max(0.0);
        let fb = fitness_b.max(0.0);
        let total = fa + fb;
        let t = if total > f32::EPSILON { fa / total } else { 0.5 };

        let weights = a
            .weights
            .iter()
            .zip(b.weights.iter())
            .map(|(&wa, &wb)| t * wa + (1.0 - t) * wb)
            .collect();

        Brain {
            input_size: a.input_size,
            hidden_size: a.hidden_size,
            weights,
        }
    }

    /// Clone the flat weight blob for inheritance or export
    pub fn to_blob(&self) -> Vec<f32> {
        self.weights.clone()
    }
}

/// Mutation-rate multiplier for a fitness percentile in [0, 1]
fn percentile_scale(percentile: Option<f32>) -> f32 {
    match percentile {
        None => 1.0,
        Some(p) if p >= 0.75 => 0.5,
        Some(p) if p <= 0.25 => 1.5,
        Some(p) => 2.0 - 2.0 * p,
    }
}
