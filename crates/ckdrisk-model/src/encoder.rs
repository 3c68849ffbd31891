//! Categorical encoders fitted at training time.
//!
//! Each categorical column gets a [`LabelEncoder`]: the distinct values seen
//! during training, sorted, with the code of a value being its position in
//! that list. [`EncoderMapping`] holds one encoder per column as named fields,
//! so inference can never ask for a column that was not fitted.

use std::collections::BTreeSet;

use ckdrisk_core::{CATEGORICAL_COLUMNS, FeatureRecord, N_FEATURES};
use serde::{Deserialize, Serialize};

use crate::EncodeError;

/// Sorted string ↔ code lookup for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit from the raw values of one column. Duplicates are collapsed.
    ///
    /// Returns `None` when `values` is empty.
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        if distinct.is_empty() {
            return None;
        }
        Some(Self {
            classes: distinct.into_iter().map(str::to_string).collect(),
        })
    }

    /// Known categories in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, value: &str) -> Option<u32> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
            .map(|i| i as u32)
    }

    pub fn inverse_transform(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// True when the class list is non-empty, strictly sorted, and free of
    /// duplicates. Deserialized encoders are checked with this before use.
    pub fn is_well_formed(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

/// One fitted encoder per categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderMapping {
    pub rbc: LabelEncoder,
    pub pc: LabelEncoder,
    pub pcc: LabelEncoder,
    pub ba: LabelEncoder,
    pub htn: LabelEncoder,
}

impl EncoderMapping {
    /// Fit every categorical column from a training table.
    pub fn fit<'a>(
        records: impl IntoIterator<Item = &'a FeatureRecord> + Clone,
    ) -> Result<Self, EncodeError> {
        let fit_column = |idx: usize| {
            LabelEncoder::fit(
                records
                    .clone()
                    .into_iter()
                    .map(move |r| r.categorical_values()[idx]),
            )
            .ok_or(EncodeError::EmptyColumn(CATEGORICAL_COLUMNS[idx]))
        };

        Ok(Self {
            rbc: fit_column(0)?,
            pc: fit_column(1)?,
            pcc: fit_column(2)?,
            ba: fit_column(3)?,
            htn: fit_column(4)?,
        })
    }

    /// `(column, encoder)` pairs in schema order.
    pub fn columns(&self) -> [(&'static str, &LabelEncoder); 5] {
        [
            (CATEGORICAL_COLUMNS[0], &self.rbc),
            (CATEGORICAL_COLUMNS[1], &self.pc),
            (CATEGORICAL_COLUMNS[2], &self.pcc),
            (CATEGORICAL_COLUMNS[3], &self.ba),
            (CATEGORICAL_COLUMNS[4], &self.htn),
        ]
    }

    /// Codes for the five categorical fields of `record`, in schema order.
    pub fn encode_categorical(&self, record: &FeatureRecord) -> Result<[u32; 5], EncodeError> {
        let mut codes = [0u32; 5];
        for ((code, (column, encoder)), value) in codes
            .iter_mut()
            .zip(self.columns())
            .zip(record.categorical_values())
        {
            *code = encoder
                .transform(value)
                .ok_or_else(|| EncodeError::UnknownCategory {
                    column,
                    value: value.to_string(),
                })?;
        }
        Ok(codes)
    }

    /// Full numeric feature vector in classifier column order.
    pub fn encode(&self, record: &FeatureRecord) -> Result<[f64; N_FEATURES], EncodeError> {
        let codes = self.encode_categorical(record)?;
        let mut row = [0.0f64; N_FEATURES];
        let (numeric, categorical) = row.split_at_mut(5);
        numeric.copy_from_slice(&record.numeric_values());
        for (slot, code) in categorical.iter_mut().zip(codes) {
            *slot = f64::from(code);
        }
        Ok(row)
    }

    /// Map a code back to its category string for the given column.
    pub fn decode(&self, column: &str, code: u32) -> Result<&str, EncodeError> {
        let (column, encoder) = self
            .columns()
            .into_iter()
            .find(|(name, _)| *name == column)
            .ok_or_else(|| EncodeError::UnknownColumn(column.to_string()))?;
        encoder
            .inverse_transform(code)
            .ok_or(EncodeError::UnknownCode { column, code })
    }

    /// Name of the first column whose encoder is not well formed.
    pub fn first_malformed(&self) -> Option<&'static str> {
        self.columns()
            .into_iter()
            .find(|(_, enc)| !enc.is_well_formed())
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rbc: &str, pc: &str, pcc: &str, ba: &str, htn: &str) -> FeatureRecord {
        FeatureRecord {
            age: 40.0,
            bp: 80.0,
            sg: 1.015,
            al: 1,
            su: 2,
            rbc: rbc.into(),
            pc: pc.into(),
            pcc: pcc.into(),
            ba: ba.into(),
            htn: htn.into(),
        }
    }

    fn fitted() -> EncoderMapping {
        let rows = [
            record("normal", "abnormal", "present", "notpresent", "yes"),
            record("abnormal", "normal", "notpresent", "present", "no"),
            record("normal", "normal", "present", "present", "yes"),
        ];
        EncoderMapping::fit(&rows).unwrap()
    }

    #[test]
    fn label_encoder_sorts_and_dedups() {
        let enc = LabelEncoder::fit(["yes", "no", "yes", "no", "no"]).unwrap();
        assert_eq!(enc.classes(), ["no", "yes"]);
        assert_eq!(enc.transform("no"), Some(0));
        assert_eq!(enc.transform("yes"), Some(1));
        assert_eq!(enc.inverse_transform(1), Some("yes"));
        assert_eq!(enc.inverse_transform(2), None);
    }

    #[test]
    fn label_encoder_empty_input() {
        assert!(LabelEncoder::fit(std::iter::empty::<&str>()).is_none());
    }

    #[test]
    fn mapping_assigns_sorted_codes() {
        let m = fitted();
        assert_eq!(m.rbc.classes(), ["abnormal", "normal"]);
        assert_eq!(m.pcc.classes(), ["notpresent", "present"]);
        assert_eq!(m.htn.classes(), ["no", "yes"]);

        let r = record("normal", "abnormal", "notpresent", "present", "no");
        assert_eq!(m.encode_categorical(&r).unwrap(), [1, 0, 0, 1, 0]);
    }

    #[test]
    fn encode_is_idempotent() {
        let m = fitted();
        let r = record("abnormal", "normal", "present", "notpresent", "yes");
        let first = m.encode(&r).unwrap();
        for _ in 0..5 {
            assert_eq!(m.encode(&r).unwrap(), first);
        }
    }

    #[test]
    fn encode_builds_full_row_in_column_order() {
        let m = fitted();
        let r = record("abnormal", "normal", "present", "notpresent", "yes");
        assert_eq!(
            m.encode(&r).unwrap(),
            [40.0, 80.0, 1.015, 1.0, 2.0, 0.0, 1.0, 1.0, 0.0, 1.0]
        );
    }

    #[test]
    fn unseen_category_is_rejected() {
        let m = fitted();
        let r = record("normal", "normal", "present", "present", "maybe");
        let err = m.encode(&r).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnknownCategory {
                column: "htn",
                value: "maybe".into()
            }
        );
    }

    #[test]
    fn category_lookup_is_case_sensitive() {
        let m = fitted();
        let r = record("Normal", "normal", "present", "present", "yes");
        assert!(matches!(
            m.encode(&r),
            Err(EncodeError::UnknownCategory { column: "rbc", .. })
        ));
    }

    #[test]
    fn fit_on_empty_table_fails() {
        let rows: [FeatureRecord; 0] = [];
        assert_eq!(
            EncoderMapping::fit(&rows).unwrap_err(),
            EncodeError::EmptyColumn("rbc")
        );
    }

    #[test]
    fn decode_round_trips_codes() {
        let m = fitted();
        assert_eq!(m.decode("pc", 0).unwrap(), "abnormal");
        assert_eq!(m.decode("ba", 1).unwrap(), "present");
        assert_eq!(
            m.decode("age", 0).unwrap_err(),
            EncodeError::UnknownColumn("age".into())
        );
        assert_eq!(
            m.decode("ba", 7).unwrap_err(),
            EncodeError::UnknownCode {
                column: "ba",
                code: 7
            }
        );
    }

    #[test]
    fn columns_follow_schema_order() {
        let names: Vec<&str> = fitted().columns().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, CATEGORICAL_COLUMNS);
    }

    #[test]
    fn malformed_encoders_are_detected() {
        let mut m = fitted();
        assert_eq!(m.first_malformed(), None);
        m.pcc = serde_json::from_str(r#"{"classes": ["present", "notpresent"]}"#).unwrap();
        assert_eq!(m.first_malformed(), Some("pcc"));
    }
}
