//! One patient's raw measurements, as collected by the form.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::schema::{CATEGORICAL_FIELDS, NUMERIC_FIELDS};

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("{field} = {value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} = {value} must be a whole number")]
    NotWhole { field: &'static str, value: f64 },
}

/// Raw feature record in schema order.
///
/// Categorical fields are kept as the strings the caller sent. Whether they
/// are known categories is decided by the encoder mapping, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub age: f64,
    pub bp: f64,
    pub sg: f64,
    pub al: u8,
    pub su: u8,
    pub rbc: String,
    pub pc: String,
    pub pcc: String,
    pub ba: String,
    pub htn: String,
}

impl Default for FeatureRecord {
    /// The values the form shows before the user touches anything.
    fn default() -> Self {
        let [age, bp, sg, al, su] = NUMERIC_FIELDS.map(|f| f.default);
        let [rbc, pc, pcc, ba, htn] = CATEGORICAL_FIELDS.map(|f| f.default_option().to_string());
        Self {
            age,
            bp,
            sg,
            al: al as u8,
            su: su as u8,
            rbc,
            pc,
            pcc,
            ba,
            htn,
        }
    }
}

impl FeatureRecord {
    /// Numeric values in schema order (`age, bp, sg, al, su`).
    pub fn numeric_values(&self) -> [f64; 5] {
        [
            self.age,
            self.bp,
            self.sg,
            f64::from(self.al),
            f64::from(self.su),
        ]
    }

    /// Raw categorical values in schema order (`rbc, pc, pcc, ba, htn`).
    pub fn categorical_values(&self) -> [&str; 5] {
        [
            self.rbc.as_str(),
            self.pc.as_str(),
            self.pcc.as_str(),
            self.ba.as_str(),
            self.htn.as_str(),
        ]
    }

    /// Check every numeric field against its documented range, and that
    /// `age` and `bp` carry no fractional part.
    ///
    /// NaN is never in range. Categorical values are not checked.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in NUMERIC_FIELDS.iter().zip(self.numeric_values()) {
            if !(field.min..=field.max).contains(&value) {
                debug!(field = field.name, value, "numeric field out of range");
                return Err(RecordError::OutOfRange {
                    field: field.name,
                    value,
                    min: field.min,
                    max: field.max,
                });
            }
            if field.integer && value.fract() != 0.0 {
                debug!(field = field.name, value, "numeric field not whole");
                return Err(RecordError::NotWhole {
                    field: field.name,
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureRecord {
        FeatureRecord {
            age: 40.0,
            bp: 80.0,
            sg: 1.015,
            al: 0,
            su: 0,
            rbc: "normal".into(),
            pc: "normal".into(),
            pcc: "notpresent".into(),
            ba: "notpresent".into(),
            htn: "no".into(),
        }
    }

    #[test]
    fn default_matches_form_defaults() {
        let r = FeatureRecord::default();
        assert_eq!(r.age, 40.0);
        assert_eq!(r.bp, 80.0);
        assert_eq!(r.sg, 1.015);
        assert_eq!((r.al, r.su), (0, 0));
        assert_eq!(r.categorical_values(), ["normal", "normal", "present", "present", "yes"]);
    }

    #[test]
    fn values_in_schema_order() {
        let r = sample();
        assert_eq!(r.numeric_values(), [40.0, 80.0, 1.015, 0.0, 0.0]);
        assert_eq!(
            r.categorical_values(),
            ["normal", "normal", "notpresent", "notpresent", "no"]
        );
    }

    #[test]
    fn validate_accepts_boundaries() {
        let mut r = sample();
        r.age = 100.0;
        r.bp = 0.0;
        r.sg = 1.025;
        r.al = 5;
        r.su = 5;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let mut r = sample();
        r.sg = 1.03;
        let err = r.validate().unwrap_err();
        assert!(matches!(err, RecordError::OutOfRange { field: "sg", .. }));

        let mut r = sample();
        r.su = 6;
        assert!(matches!(
            r.validate(),
            Err(RecordError::OutOfRange { field: "su", .. })
        ));
    }

    #[test]
    fn validate_rejects_fractional_age_and_bp() {
        let mut r = sample();
        r.age = 40.5;
        assert_eq!(
            r.validate(),
            Err(RecordError::NotWhole {
                field: "age",
                value: 40.5
            })
        );

        let mut r = sample();
        r.bp = 80.25;
        let err = r.validate().unwrap_err();
        assert!(matches!(err, RecordError::NotWhole { field: "bp", .. }));
        assert_eq!(err.to_string(), "bp = 80.25 must be a whole number");

        let mut r = sample();
        r.sg = 1.0125;
        assert!(r.validate().is_ok());
    }

    #[test]
    fn validate_rejects_nan() {
        let mut r = sample();
        r.age = f64::NAN;
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_ignores_unknown_categories() {
        let mut r = sample();
        r.htn = "maybe".into();
        assert!(r.validate().is_ok());
    }

    #[test]
    fn json_field_names_match_schema() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        for col in crate::FEATURE_COLUMNS {
            assert!(obj.contains_key(col), "missing {col}");
        }
        assert_eq!(obj.len(), crate::N_FEATURES);
    }

    #[test]
    fn json_accepts_integer_numbers() {
        let json = r#"{
            "age": 40, "bp": 80, "sg": 1.015, "al": 0, "su": 0,
            "rbc": "normal", "pc": "normal", "pcc": "notpresent",
            "ba": "notpresent", "htn": "no"
        }"#;
        let parsed: FeatureRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.age, 40.0);
        assert_eq!(parsed.al, 0);
        assert!((parsed.sg - 1.015).abs() < 1e-12);
        assert_eq!(parsed.categorical_values(), sample().categorical_values());
    }
}
