//! Encoding of raw user inputs into model feature vectors.
//!
//! Categorical selections become the indicator columns the model was trained
//! on, and the final vector is laid out in the exact column order recorded in
//! the artifact.

use crate::error::EncodingError;
use crate::types::inputs::{Island, RawInputs, Sex};

/// Validated, typed measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenguinMeasurements {
    pub bill_length_mm: f64,
    pub bill_depth_mm: f64,
    pub flipper_length_mm: f64,
    pub body_mass_g: f64,
    pub island: Island,
    pub sex: Sex,
}

impl PenguinMeasurements {
    /// Check presence and validity of every raw field
    pub fn from_raw(raw: &RawInputs) -> Result<Self, EncodingError> {
        Ok(Self {
            bill_length_mm: numeric(raw.bill_length_mm, "bill_length_mm")?,
            bill_depth_mm: numeric(raw.bill_depth_mm, "bill_depth_mm")?,
            flipper_length_mm: numeric(raw.flipper_length_mm, "flipper_length_mm")?,
            body_mass_g: numeric(raw.body_mass_g, "body_mass_g")?,
            island: raw
                .island
                .as_deref()
                .ok_or(EncodingError::MissingField { field: "island" })?
                .parse()?,
            sex: raw
                .sex
                .as_deref()
                .ok_or(EncodingError::MissingField { field: "sex" })?
                .parse()?,
        })
    }

    /// Every column the encoder knows how to produce, helpers included
    fn columns(&self) -> Vec<(&'static str, f64)> {
        let mut columns = vec![
            ("bill_length_mm", self.bill_length_mm),
            ("bill_depth_mm", self.bill_depth_mm),
            ("flipper_length_mm", self.flipper_length_mm),
            ("body_mass_g", self.body_mass_g),
        ];
        columns.extend(self.island.indicators());
        columns.extend(self.sex.indicators());
        columns
    }
}

fn numeric(value: Option<f64>, field: &'static str) -> Result<f64, EncodingError> {
    let value = value.ok_or(EncodingError::MissingField { field })?;
    if !value.is_finite() {
        return Err(EncodingError::NotFinite { field, value });
    }
    Ok(value)
}

/// Feature values laid out in model column order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }
}

/// Builds feature vectors for a fixed column order
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    feature_order: Vec<String>,
}

impl FeatureEncoder {
    /// Create an encoder for the given model column order
    pub fn new(feature_order: &[String]) -> Self {
        Self {
            feature_order: feature_order.to_vec(),
        }
    }

    /// Encode raw inputs.
    ///
    /// Derived columns the model does not list are dropped; a listed column the
    /// encoder cannot derive is an error.
    pub fn encode(&self, raw: &RawInputs) -> Result<FeatureVector, EncodingError> {
        let measurements = PenguinMeasurements::from_raw(raw)?;
        self.encode_measurements(&measurements)
    }

    pub fn encode_measurements(
        &self,
        measurements: &PenguinMeasurements,
    ) -> Result<FeatureVector, EncodingError> {
        let columns = measurements.columns();

        let values = self
            .feature_order
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .find(|(column, _)| *column == name.as_str())
                    .map(|(_, value)| *value)
                    .ok_or_else(|| EncodingError::UnsupportedFeature(name.clone()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        Ok(FeatureVector {
            names: self.feature_order.clone(),
            values,
        })
    }
}
