//! NNUE-style leaf evaluator.
//!
//! A small feedforward network over a 768-dimensional one-hot encoding of
//! the position (12 piece types x 64 squares, feature = `piece * 64 +
//! square`). The first layer's output is the accumulator: it is the only
//! expensive product, so it is maintained incrementally on a per-ply stack
//! in lockstep with `apply_move`/`undo_move` instead of being recomputed.
//! The remaining layers (1024 -> 8 -> 32 -> 1) run at every leaf with
//! clipped-ReLU activations; the scalar output is the evaluation in
//! centipawns from White's point of view.

use std::fs;
use std::path::Path;

use crate::board::make_move::{castle_rook_transfer, Undo};
use crate::board::moves::Move;
use crate::board::position::Position;
use crate::board::types::{piece_color, Color, NUM_SQUARES};
use crate::eval::Evaluator;
use crate::search::MAX_PLY;

pub const INPUT_SIZE: usize = 768;
pub const HIDDEN1_SIZE: usize = 1024;
pub const HIDDEN2_SIZE: usize = 8;
pub const HIDDEN3_SIZE: usize = 32;
pub const OUTPUT_SIZE: usize = 1;

#[inline]
fn feature_index(piece: u8, square: u8) -> usize {
    piece as usize * NUM_SQUARES + square as usize
}

/// Dense layer; weights are stored input-major
/// (`weights[input * outputs + output]`) so a single active feature selects
/// one contiguous row.
#[derive(Debug, Clone)]
pub struct LinearLayer {
    inputs: usize,
    outputs: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
}

impl LinearLayer {
    pub fn zeroed(inputs: usize, outputs: usize) -> Self {
        LinearLayer {
            inputs,
            outputs,
            weights: vec![0.0; inputs * outputs],
            biases: vec![0.0; outputs],
        }
    }

    /// Load from whitespace-separated text files, weights iterated
    /// output-major as the training pipeline exports them.
    pub fn load(
        inputs: usize,
        outputs: usize,
        weights_path: &Path,
        biases_path: &Path,
    ) -> Result<Self, String> {
        let raw_weights = read_floats(weights_path, inputs * outputs)?;
        let biases = read_floats(biases_path, outputs)?;

        let mut weights = vec![0.0f32; inputs * outputs];
        let mut cursor = 0usize;
        for output in 0..outputs {
            for input in 0..inputs {
                weights[input * outputs + output] = raw_weights[cursor];
                cursor += 1;
            }
        }

        Ok(LinearLayer {
            inputs,
            outputs,
            weights,
            biases,
        })
    }

    fn forward(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.inputs);
        debug_assert_eq!(output.len(), self.outputs);

        output.copy_from_slice(&self.biases);
        for (i, &activation) in input.iter().enumerate() {
            if activation == 0.0 {
                continue;
            }
            let row = &self.weights[i * self.outputs..(i + 1) * self.outputs];
            for (out, &weight) in output.iter_mut().zip(row) {
                *out += weight * activation;
            }
        }
    }
}

fn read_floats(path: &Path, expected: usize) -> Result<Vec<f32>, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("cannot read {}: {err}", path.display()))?;
    let values: Result<Vec<f32>, _> = text.split_whitespace().map(str::parse::<f32>).collect();
    let values =
        values.map_err(|err| format!("bad parameter in {}: {err}", path.display()))?;
    if values.len() != expected {
        return Err(format!(
            "{} holds {} parameters, expected {expected}",
            path.display(),
            values.len()
        ));
    }
    Ok(values)
}

#[inline]
fn clipped_relu(input: &[f32], output: &mut [f32]) {
    for (out, &value) in output.iter_mut().zip(input) {
        *out = value.clamp(0.0, 1.0);
    }
}

/// The full parameter set.
#[derive(Debug, Clone)]
pub struct Network {
    layer1: LinearLayer,
    layer2: LinearLayer,
    layer3: LinearLayer,
    layer4: LinearLayer,
}

impl Network {
    pub fn zeroed() -> Self {
        Network {
            layer1: LinearLayer::zeroed(INPUT_SIZE, HIDDEN1_SIZE),
            layer2: LinearLayer::zeroed(HIDDEN1_SIZE, HIDDEN2_SIZE),
            layer3: LinearLayer::zeroed(HIDDEN2_SIZE, HIDDEN3_SIZE),
            layer4: LinearLayer::zeroed(HIDDEN3_SIZE, OUTPUT_SIZE),
        }
    }

    /// Load `layer<N>_weights.txt` / `layer<N>_biases.txt` from a
    /// directory.
    pub fn load(directory: &Path) -> Result<Self, String> {
        let file = |name: &str| directory.join(name);
        Ok(Network {
            layer1: LinearLayer::load(
                INPUT_SIZE,
                HIDDEN1_SIZE,
                &file("layer1_weights.txt"),
                &file("layer1_biases.txt"),
            )?,
            layer2: LinearLayer::load(
                HIDDEN1_SIZE,
                HIDDEN2_SIZE,
                &file("layer2_weights.txt"),
                &file("layer2_biases.txt"),
            )?,
            layer3: LinearLayer::load(
                HIDDEN2_SIZE,
                HIDDEN3_SIZE,
                &file("layer3_weights.txt"),
                &file("layer3_biases.txt"),
            )?,
            layer4: LinearLayer::load(
                HIDDEN3_SIZE,
                OUTPUT_SIZE,
                &file("layer4_weights.txt"),
                &file("layer4_biases.txt"),
            )?,
        })
    }

    /// Run everything past the accumulator.
    fn forward(&self, accumulator: &[f32]) -> f32 {
        let mut hidden1 = [0f32; HIDDEN1_SIZE];
        let mut hidden2_raw = [0f32; HIDDEN2_SIZE];
        let mut hidden2 = [0f32; HIDDEN2_SIZE];
        let mut hidden3_raw = [0f32; HIDDEN3_SIZE];
        let mut hidden3 = [0f32; HIDDEN3_SIZE];
        let mut out = [0f32; OUTPUT_SIZE];

        clipped_relu(accumulator, &mut hidden1);
        self.layer2.forward(&hidden1, &mut hidden2_raw);
        clipped_relu(&hidden2_raw, &mut hidden2);
        self.layer3.forward(&hidden2, &mut hidden3_raw);
        clipped_relu(&hidden3_raw, &mut hidden3);
        self.layer4.forward(&hidden3, &mut out);

        out[0]
    }
}

/// NNUE evaluator with a per-ply accumulator stack. `push` copies the
/// current accumulator one slot up and applies the feature deltas of the
/// move; `pop` just steps back down, so undo costs nothing.
pub struct NnueEvaluator {
    network: Network,
    accumulators: Vec<Vec<f32>>,
    top: usize,
}

impl NnueEvaluator {
    pub fn new(network: Network) -> Self {
        NnueEvaluator {
            network,
            accumulators: vec![vec![0.0; HIDDEN1_SIZE]; MAX_PLY + 1],
            top: 0,
        }
    }

    fn refresh(&mut self, position: &Position) {
        let accumulator = &mut self.accumulators[self.top];
        accumulator.copy_from_slice(&self.network.layer1.biases);

        for square in 0..NUM_SQUARES as u8 {
            if let Some(piece) = position.piece_at(square) {
                add_feature(&self.network.layer1, accumulator, piece, square);
            }
        }
    }
}

#[inline]
fn add_feature(layer1: &LinearLayer, accumulator: &mut [f32], piece: u8, square: u8) {
    let row_start = feature_index(piece, square) * HIDDEN1_SIZE;
    let row = &layer1.weights[row_start..row_start + HIDDEN1_SIZE];
    for (value, &weight) in accumulator.iter_mut().zip(row) {
        *value += weight;
    }
}

#[inline]
fn sub_feature(layer1: &LinearLayer, accumulator: &mut [f32], piece: u8, square: u8) {
    let row_start = feature_index(piece, square) * HIDDEN1_SIZE;
    let row = &layer1.weights[row_start..row_start + HIDDEN1_SIZE];
    for (value, &weight) in accumulator.iter_mut().zip(row) {
        *value -= weight;
    }
}

impl Evaluator for NnueEvaluator {
    fn reset(&mut self, position: &Position) {
        self.top = 0;
        self.refresh(position);
    }

    fn push(&mut self, _position: &Position, mv: Move, undo: &Undo) {
        debug_assert!(self.top + 1 < self.accumulators.len(), "accumulator overflow");

        let (current, next) = self.accumulators.split_at_mut(self.top + 1);
        next[0].copy_from_slice(&current[self.top]);
        self.top += 1;
        let accumulator = &mut self.accumulators[self.top];

        let layer1 = &self.network.layer1;
        sub_feature(layer1, accumulator, mv.piece, mv.from);
        add_feature(layer1, accumulator, mv.promotion, mv.to);

        if let Some(victim) = undo.captured {
            let victim_square = if undo.ep_capture {
                match piece_color(mv.piece) {
                    Color::White => mv.to - 8,
                    Color::Black => mv.to + 8,
                }
            } else {
                mv.to
            };
            sub_feature(layer1, accumulator, victim, victim_square);
        }

        if mv.castles {
            let (rook, rook_from, rook_to) = castle_rook_transfer(mv.to);
            sub_feature(layer1, accumulator, rook, rook_from);
            add_feature(layer1, accumulator, rook, rook_to);
        }
    }

    fn pop(&mut self) {
        debug_assert!(self.top > 0, "accumulator stack underflow");
        self.top -= 1;
    }

    fn evaluate(&self, _position: &Position) -> i32 {
        self.network.forward(&self.accumulators[self.top]).round() as i32
    }
}
