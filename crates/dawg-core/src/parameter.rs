//! Named effect parameters.
//!
//! Each parameter value lives in an `Arc<AtomicFloat>`, so the owning effect
//! reads it on the audio path while the control side writes through
//! [`ParameterSet::set`].

use crate::{AtomicFloat, Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Valid range and default of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParameterRange {
    pub fn new(min: f32, max: f32, default: f32) -> Self {
        debug_assert!(max >= min, "max must not be below min");
        Self {
            min,
            max,
            default: default.clamp(min, max),
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Map a real value to 0..=1.
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if range <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / range).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    range: ParameterRange,
    value: Arc<AtomicFloat>,
}

impl Parameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self) -> ParameterRange {
        self.range
    }

    pub fn value(&self) -> f32 {
        self.value.get()
    }

    /// Shared cell for the audio path.
    pub fn cell(&self) -> &Arc<AtomicFloat> {
        &self.value
    }
}

/// Ordered set of named parameters.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter and return its shared value cell.
    pub fn add(&mut self, name: impl Into<String>, range: ParameterRange) -> Arc<AtomicFloat> {
        let value = Arc::new(AtomicFloat::new(range.default));
        self.params.push(Parameter {
            name: name.into(),
            range,
            value: Arc::clone(&value),
        });
        value
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.find(name).map(Parameter::value)
    }

    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Fails with `UnknownParameter` or `ParameterOutOfRange`; never clamps.
    pub fn set(&self, name: &str, value: f32) -> Result<()> {
        let param = self
            .find(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        if !param.range.contains(value) {
            return Err(Error::out_of_range(
                name,
                value as f64,
                param.range.min as f64,
                param.range.max as f64,
            ));
        }
        param.value.set(value);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Current values keyed by name.
    pub fn values(&self) -> BTreeMap<String, f32> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.value()))
            .collect()
    }
}
