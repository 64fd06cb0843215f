//! Raw user inputs and the categorical selections they carry

use crate::error::EncodingError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Raw values handed over by the presentation surface.
///
/// Every field is optional here; presence is checked during encoding so that a
/// missing value is reported as an encoding failure for that request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawInputs {
    /// Bill length (mm), slider range 30-60
    pub bill_length_mm: Option<f64>,

    /// Bill depth (mm), slider range 10-25
    pub bill_depth_mm: Option<f64>,

    /// Flipper length (mm), slider range 170-240
    pub flipper_length_mm: Option<f64>,

    /// Body mass (g), slider range 2500-6500
    pub body_mass_g: Option<f64>,

    /// Island name, one of Biscoe, Dream, Torgersen
    pub island: Option<String>,

    /// Sex, one of Female, Male
    pub sex: Option<String>,
}

impl RawInputs {
    /// Create a fully populated set of inputs
    pub fn new(
        bill_length_mm: f64,
        bill_depth_mm: f64,
        flipper_length_mm: f64,
        body_mass_g: f64,
        island: &str,
        sex: &str,
    ) -> Self {
        Self {
            bill_length_mm: Some(bill_length_mm),
            bill_depth_mm: Some(bill_depth_mm),
            flipper_length_mm: Some(flipper_length_mm),
            body_mass_g: Some(body_mass_g),
            island: Some(island.to_string()),
            sex: Some(sex.to_string()),
        }
    }

    /// Parse one JSON request line.
    ///
    /// Absent and `null` fields stay `None`. A field of the wrong JSON type is
    /// reported against that field; unknown keys are ignored.
    pub fn from_json_str(line: &str) -> Result<Self, EncodingError> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| EncodingError::MalformedRequest(e.to_string()))?;
        match value {
            Value::Object(object) => Self::from_json_object(&object),
            other => Err(EncodingError::MalformedRequest(format!(
                "expected an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_object(object: &Map<String, Value>) -> Result<Self, EncodingError> {
        Ok(Self {
            bill_length_mm: number_field(object, "bill_length_mm")?,
            bill_depth_mm: number_field(object, "bill_depth_mm")?,
            flipper_length_mm: number_field(object, "flipper_length_mm")?,
            body_mass_g: number_field(object, "body_mass_g")?,
            island: string_field(object, "island")?,
            sex: string_field(object, "sex")?,
        })
    }
}

fn number_field(object: &Map<String, Value>, field: &'static str) -> Result<Option<f64>, EncodingError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(EncodingError::InvalidType {
            field,
            expected: "a number",
            found: json_kind(other),
        }),
    }
}

fn string_field(object: &Map<String, Value>, field: &'static str) -> Result<Option<String>, EncodingError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(EncodingError::InvalidType {
            field,
            expected: "a string",
            found: json_kind(other),
        }),
    }
}

/// Short description of a JSON value for error messages
fn json_kind(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Island where the penguin was observed. `Biscoe` is the baseline category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Island {
    Biscoe,
    Dream,
    Torgersen,
}

impl Island {
    pub const ALL: [Island; 3] = [Island::Biscoe, Island::Dream, Island::Torgersen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Island::Biscoe => "Biscoe",
            Island::Dream => "Dream",
            Island::Torgersen => "Torgersen",
        }
    }

    /// Indicator columns for this island, in column-name order.
    ///
    /// At most one of `island_Dream` / `island_Torgersen` is set; the baseline
    /// sets neither. `island_Biscoe` is a helper that models trained with a
    /// dropped baseline never see.
    pub fn indicators(&self) -> [(&'static str, f64); 3] {
        let flag = |island: Island| if *self == island { 1.0 } else { 0.0 };
        [
            ("island_Biscoe", flag(Island::Biscoe)),
            ("island_Dream", flag(Island::Dream)),
            ("island_Torgersen", flag(Island::Torgersen)),
        ]
    }
}

impl FromStr for Island {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Island::ALL
            .into_iter()
            .find(|island| island.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EncodingError::UnrecognizedCategory {
                field: "island",
                value: s.to_string(),
                expected: "Biscoe, Dream, Torgersen".to_string(),
            })
    }
}

impl fmt::Display for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sex of the penguin. `Female` is the baseline category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Female => "Female",
            Sex::Male => "Male",
        }
    }

    pub fn indicators(&self) -> [(&'static str, f64); 2] {
        match self {
            Sex::Female => [("sex_female", 1.0), ("sex_male", 0.0)],
            Sex::Male => [("sex_female", 0.0), ("sex_male", 1.0)],
        }
    }
}

impl FromStr for Sex {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Sex::ALL
            .into_iter()
            .find(|sex| sex.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EncodingError::UnrecognizedCategory {
                field: "sex",
                value: s.to_string(),
                expected: "Female, Male".to_string(),
            })
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_island_parsing_is_case_insensitive() {
        assert_eq!("dream".parse::<Island>().unwrap(), Island::Dream);
        assert_eq!(" Torgersen ".parse::<Island>().unwrap(), Island::Torgersen);
        assert_eq!("BISCOE".parse::<Island>().unwrap(), Island::Biscoe);
    }

    #[test]
    fn test_unknown_island_rejected() {
        let err = "Anvers".parse::<Island>().unwrap_err();
        assert_eq!(err.field(), Some("island"));

        // The empty label of a decorative selector is not a valid island
        assert!("".parse::<Island>().is_err());
    }

    #[test]
    fn test_at_most_one_island_indicator_set() {
        for island in Island::ALL {
            let set: f64 = island.indicators()[1..].iter().map(|(_, v)| v).sum();
            let expected = if island == Island::Biscoe { 0.0 } else { 1.0 };
            assert_eq!(set, expected, "island {island}");
        }
    }

    #[test]
    fn test_sex_indicators() {
        assert_eq!(Sex::Male.indicators()[1], ("sex_male", 1.0));
        assert_eq!(Sex::Female.indicators()[1], ("sex_male", 0.0));
        assert!("unknown".parse::<Sex>().is_err());
    }

    #[test]
    fn test_raw_inputs_parsing_allows_missing_fields() {
        let raw = RawInputs::from_json_str(
            r#"{"bill_length_mm": 40, "island": "Dream", "sex": null, "year": 2008}"#,
        )
        .unwrap();
        assert_eq!(raw.bill_length_mm, Some(40.0));
        assert_eq!(raw.island.as_deref(), Some("Dream"));
        assert!(raw.sex.is_none());
        assert!(raw.body_mass_g.is_none());
    }

    #[test]
    fn test_wrong_json_type_names_field() {
        let err = RawInputs::from_json_str(r#"{"island": "Torgersen", "sex": 1}"#).unwrap_err();
        assert_eq!(
            err,
            EncodingError::InvalidType {
                field: "sex",
                expected: "a string",
                found: "number 1".to_string(),
            }
        );

        let err = RawInputs::from_json_str(r#"{"bill_length_mm": "40"}"#).unwrap_err();
        assert_eq!(err.field(), Some("bill_length_mm"));
        assert!(err.to_string().contains("must be a number"));
    }

    #[test]
    fn test_non_object_request_is_malformed() {
        assert!(matches!(
            RawInputs::from_json_str("{ not json"),
            Err(EncodingError::MalformedRequest(_))
        ));
        let err = RawInputs::from_json_str("[40, 18]").unwrap_err();
        assert_eq!(err.field(), None);
        assert!(err.to_string().contains("an array"));
    }
}
