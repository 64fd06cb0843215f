//! Line-oriented prediction session.
//!
//! Each request is one JSON object of raw inputs. Every request, including one
//! that fails to parse, ends up in the session metrics exactly once.

use crate::display::{self, Slider};
use crate::error::{EncodingError, InferenceError};
use crate::metrics::SessionMetrics;
use crate::models::artifact::ModelArtifact;
use crate::models::inference;
use crate::types::inputs::RawInputs;
use crate::types::prediction::PredictionResult;
use std::time::Instant;
use tracing::{debug, warn};

/// Parse, check and predict a single request line
pub fn handle_request(
    line: &str,
    artifact: &ModelArtifact,
    metrics: &SessionMetrics,
) -> Result<PredictionResult, InferenceError> {
    let start = Instant::now();

    match parse_request(line).and_then(|raw| inference::predict(&raw, artifact)) {
        Ok(result) => {
            metrics.record_success(start.elapsed());
            debug!(label = %result.label(), "Request served");
            Ok(result)
        }
        Err(e) => {
            metrics.record_failure(&e);
            warn!(error = %e, "Prediction request failed");
            Err(e)
        }
    }
}

fn parse_request(line: &str) -> Result<RawInputs, InferenceError> {
    let raw = RawInputs::from_json_str(line)?;
    check_ranges(&raw)?;
    Ok(raw)
}

/// Apply the slider bounds to every numeric value that is present.
///
/// Non-finite values are left to the encoder, which reports them as such.
pub fn check_ranges(raw: &RawInputs) -> Result<(), EncodingError> {
    let fields: [(&Slider, Option<f64>); 4] = [
        (&display::BILL_LENGTH, raw.bill_length_mm),
        (&display::BILL_DEPTH, raw.bill_depth_mm),
        (&display::FLIPPER_LENGTH, raw.flipper_length_mm),
        (&display::BODY_MASS, raw.body_mass_g),
    ];

    for (slider, value) in fields {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            slider.check(value)?;
        }
    }
    Ok(())
}
