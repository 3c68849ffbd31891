//! Fixed feature schema for CKD risk records.
//!
//! Column order here is the training order of the classifier. Changing it
//! invalidates every persisted model artifact.

/// Numeric columns, in schema order.
pub const NUMERIC_COLUMNS: [&str; 5] = ["age", "bp", "sg", "al", "su"];

/// Categorical columns, in schema order.
pub const CATEGORICAL_COLUMNS: [&str; 5] = ["rbc", "pc", "pcc", "ba", "htn"];

/// All feature columns in the order the classifier consumes them.
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "age", "bp", "sg", "al", "su", "rbc", "pc", "pcc", "ba", "htn",
];

pub const N_FEATURES: usize = 10;

/// Form-level description of a numeric input.
#[derive(Debug, Clone, Copy)]
pub struct NumericField {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    /// Only whole numbers are accepted.
    pub integer: bool,
}

/// Form-level description of a categorical input.
///
/// `options` is in display order; the first option is the form default.
#[derive(Debug, Clone, Copy)]
pub struct CategoricalField {
    pub name: &'static str,
    pub label: &'static str,
    pub options: &'static [&'static str],
}

impl CategoricalField {
    pub fn default_option(&self) -> &'static str {
        self.options[0]
    }
}

pub const NUMERIC_FIELDS: [NumericField; 5] = [
    NumericField {
        name: "age",
        label: "Age",
        min: 0.0,
        max: 100.0,
        step: 1.0,
        default: 40.0,
        integer: true,
    },
    NumericField {
        name: "bp",
        label: "Blood Pressure",
        min: 0.0,
        max: 200.0,
        step: 1.0,
        default: 80.0,
        integer: true,
    },
    NumericField {
        name: "sg",
        label: "Specific Gravity",
        min: 1.0,
        max: 1.025,
        step: 0.001,
        default: 1.015,
        integer: false,
    },
    NumericField {
        name: "al",
        label: "Albumin",
        min: 0.0,
        max: 5.0,
        step: 1.0,
        default: 0.0,
        integer: true,
    },
    NumericField {
        name: "su",
        label: "Sugar",
        min: 0.0,
        max: 5.0,
        step: 1.0,
        default: 0.0,
        integer: true,
    },
];

pub const CATEGORICAL_FIELDS: [CategoricalField; 5] = [
    CategoricalField {
        name: "rbc",
        label: "Red Blood Cells",
        options: &["normal", "abnormal"],
    },
    CategoricalField {
        name: "pc",
        label: "Pus Cell",
        options: &["normal", "abnormal"],
    },
    CategoricalField {
        name: "pcc",
        label: "Pus Cell Clumps",
        options: &["present", "notpresent"],
    },
    CategoricalField {
        name: "ba",
        label: "Bacteria",
        options: &["present", "notpresent"],
    },
    CategoricalField {
        name: "htn",
        label: "Hypertension",
        options: &["yes", "no"],
    },
];
