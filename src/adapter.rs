//! Host-trainer batch adapters.
//!
//! Trainers hand over a batch dictionary with per-response rewards and token
//! lengths under framework-specific keys, either flat (`N = B * G` values) or
//! nested (`B` rows of `G`). The adapter pulls those arrays out of a JSON
//! object, runs the mode dispatch, and returns advantages in the same shape
//! the rewards came in.
//!
//! The verl and slime presets differ only in name; both produce identical
//! advantages for the same batch.

use serde_json::{Map, Value};
use tracing::debug;

use crate::advantage::{
    compute_advantage, compute_advantage_nested, infer_correct_mask, shape_rewards, GroupLayout,
    Mode, CORRECT_THRESHOLD,
};
use crate::config::{AdapterConfig, AdvantageConfig};
use crate::error::{DcaError, Result};

/// A per-response column read from the batch.
#[derive(Debug, Clone, PartialEq)]
enum Column<T> {
    Flat(Vec<T>),
    Nested(Vec<Vec<T>>),
}

impl<T: Clone> Column<T> {
    fn into_flat(self) -> Vec<T> {
        match self {
            Column::Flat(v) => v,
            Column::Nested(rows) => rows.concat(),
        }
    }

    /// Split into rows matching `sizes`. Flat columns are cut in order.
    fn into_rows(self, sizes: &[usize], key: &str) -> Result<Vec<Vec<T>>> {
        match self {
            Column::Nested(rows) => Ok(rows),
            Column::Flat(values) => {
                let needed: usize = sizes.iter().sum();
                if values.len() < needed {
                    return Err(DcaError::InvalidBatch {
                        key: key.to_string(),
                        reason: format!("expected {needed} values to match rewards, got {}", values.len()),
                    });
                }
                let mut rest = values.as_slice();
                let mut rows = Vec::with_capacity(sizes.len());
                for &size in sizes {
                    let (row, tail) = rest.split_at(size);
                    rows.push(row.to_vec());
                    rest = tail;
                }
                Ok(rows)
            }
        }
    }
}

/// Reads batch dictionaries and computes advantages for them.
#[derive(Debug, Clone)]
pub struct BatchAdapter {
    config: AdapterConfig,
}

impl BatchAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Preset for verl-style batches (`rewards`, `response_lengths`).
    pub fn verl() -> Self {
        Self::new(AdapterConfig::default())
    }

    /// Preset for slime-style batches. Same keys and semantics as verl.
    pub fn slime() -> Self {
        Self::new(AdapterConfig::default())
    }

    /// Treat flat batches as consecutive groups of `group_size`.
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.config.group_size = Some(group_size);
        self
    }

    /// Read correctness flags from `key` instead of inferring them.
    pub fn with_correct_key(mut self, key: impl Into<String>) -> Self {
        self.config.correct_key = Some(key.into());
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Compute advantages for `batch`.
    ///
    /// Flat rewards produce a flat array; nested rewards produce a nested one.
    pub fn compute(&self, batch: &Map<String, Value>, advantage: &AdvantageConfig) -> Result<Value> {
        let rewards = read_column(batch, &self.config.reward_key, as_f64)?;
        let lengths = read_column(batch, &self.config.length_key, as_f64)?;
        let correct = self.read_correct(batch)?;

        match rewards {
            Column::Flat(rewards) => {
                let lengths = lengths.into_flat();
                let correct = correct.map(Column::into_flat);
                let layout = GroupLayout::from(self.config.group_size);
                debug!(responses = rewards.len(), ?layout, mode = %advantage.mode, "Adapting flat batch");

                let adv = compute_advantage(&rewards, &lengths, correct.as_deref(), layout, advantage)?;
                Ok(to_json_flat(&adv))
            }
            Column::Nested(rewards) => {
                let sizes: Vec<usize> = rewards.iter().map(Vec::len).collect();
                let lengths = lengths.into_rows(&sizes, &self.config.length_key)?;
                let correct = correct
                    .map(|c| c.into_rows(&sizes, "correct_mask"))
                    .transpose()?;
                debug!(groups = rewards.len(), mode = %advantage.mode, "Adapting nested batch");

                let adv = compute_advantage_nested(&rewards, &lengths, correct.as_deref(), advantage)?;
                Ok(Value::Array(adv.iter().map(|row| to_json_flat(row)).collect()))
            }
        }
    }

    /// Shaped scalar rewards for `batch` under `mode`, in the rewards' shape.
    ///
    /// Correctness comes from the correctness key when configured, otherwise
    /// from thresholding the rewards themselves.
    pub fn shape(&self, batch: &Map<String, Value>, mode: Mode, gamma: f64) -> Result<Value> {
        let rewards = read_column(batch, &self.config.reward_key, as_f64)?;
        let lengths = read_column(batch, &self.config.length_key, as_f64)?.into_flat();

        let (flat_rewards, sizes) = match &rewards {
            Column::Flat(v) => (v.clone(), None),
            Column::Nested(rows) => (rows.concat(), Some(rows.iter().map(Vec::len).collect::<Vec<_>>())),
        };
        let mut correct = match self.read_correct(batch)? {
            Some(c) => c.into_flat(),
            None => infer_correct_mask(&flat_rewards, CORRECT_THRESHOLD),
        };

        if correct.len() < flat_rewards.len() {
            return Err(DcaError::ShapeMismatch {
                field: "correct_mask",
                expected: flat_rewards.len(),
                actual: correct.len(),
            });
        }
        correct.truncate(flat_rewards.len());
        if lengths.len() < correct.len() {
            return Err(DcaError::ShapeMismatch {
                field: "lengths",
                expected: correct.len(),
                actual: lengths.len(),
            });
        }
        let shaped = shape_rewards(&correct, &lengths, mode, gamma);

        match sizes {
            None => Ok(to_json_flat(&shaped)),
            Some(sizes) => {
                let rows = Column::Flat(shaped).into_rows(&sizes, &self.config.reward_key)?;
                Ok(Value::Array(rows.iter().map(|row| to_json_flat(row)).collect()))
            }
        }
    }

    fn read_correct(&self, batch: &Map<String, Value>) -> Result<Option<Column<bool>>> {
        match &self.config.correct_key {
            Some(key) if batch.contains_key(key) => Ok(Some(read_column(batch, key, as_bool)?)),
            _ => Ok(None),
        }
    }
}

fn read_column<T>(
    batch: &Map<String, Value>,
    key: &str,
    convert: fn(&Value) -> Option<T>,
) -> Result<Column<T>> {
    let value = batch
        .get(key)
        .ok_or_else(|| DcaError::MissingKey(key.to_string()))?;
    let items = value.as_array().ok_or_else(|| DcaError::InvalidBatch {
        key: key.to_string(),
        reason: "expected an array".into(),
    })?;

    let invalid = |reason: &str| DcaError::InvalidBatch {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if items.iter().all(Value::is_array) && !items.is_empty() {
        let rows = items
            .iter()
            .map(|row| {
                row.as_array()
                    .into_iter()
                    .flatten()
                    .map(|v| convert(v).ok_or_else(|| invalid("row holds a value of the wrong type")))
                    .collect::<Result<Vec<T>>>()
            })
            .collect::<Result<Vec<Vec<T>>>>()?;
        return Ok(Column::Nested(rows));
    }

    items
        .iter()
        .map(|v| convert(v).ok_or_else(|| invalid("array holds a value of the wrong type")))
        .collect::<Result<Vec<T>>>()
        .map(Column::Flat)
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
}

fn as_bool(v: &Value) -> Option<bool> {
    v.as_bool().or_else(|| v.as_f64().map(|x| x != 0.0))
}

fn to_json_flat(values: &[f64]) -> Value {
    Value::Array(values.iter().map(|&v| Value::from(v)).collect())
}
