//! Server-rendered form page.
//!
//! The page is plain HTML with no scripts: the form posts back to
//! `/predict` and the response is the same page with a result section.

use ckdrisk_core::FeatureRecord;
use ckdrisk_core::schema::{CATEGORICAL_FIELDS, CategoricalField, NUMERIC_FIELDS, NumericField};
use ckdrisk_model::{Prediction, RiskLabel};
use serde::Deserialize;

use crate::ApiError;

pub const DISCLAIMER: &str = "Disclaimer: This is a prediction tool and should not be used as a substitute for professional medical advice.";

/// Selectable levels for albumin and sugar.
const LEVELS: [&str; 6] = ["0", "1", "2", "3", "4", "5"];

/// Raw form fields exactly as submitted.
///
/// Kept as strings so a rejected submission can be shown back unchanged.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormInput {
    pub age: String,
    pub bp: String,
    pub sg: String,
    pub al: String,
    pub su: String,
    pub rbc: String,
    pub pc: String,
    pub pcc: String,
    pub ba: String,
    pub htn: String,
}

impl Default for FormInput {
    fn default() -> Self {
        Self::from(&FeatureRecord::default())
    }
}

impl From<&FeatureRecord> for FormInput {
    fn from(r: &FeatureRecord) -> Self {
        Self {
            age: r.age.to_string(),
            bp: r.bp.to_string(),
            sg: format!("{:.3}", r.sg),
            al: r.al.to_string(),
            su: r.su.to_string(),
            rbc: r.rbc.clone(),
            pc: r.pc.clone(),
            pcc: r.pcc.clone(),
            ba: r.ba.clone(),
            htn: r.htn.clone(),
        }
    }
}

impl FormInput {
    /// Parse the numeric fields. Ranges and categories are checked later.
    pub fn to_record(&self) -> Result<FeatureRecord, ApiError> {
        Ok(FeatureRecord {
            age: parse_number("age", &self.age)?,
            bp: parse_number("bp", &self.bp)?,
            sg: parse_number("sg", &self.sg)?,
            al: parse_level("al", &self.al)?,
            su: parse_level("su", &self.su)?,
            rbc: self.rbc.trim().to_string(),
            pc: self.pc.trim().to_string(),
            pcc: self.pcc.trim().to_string(),
            ba: self.ba.trim().to_string(),
            htn: self.htn.trim().to_string(),
        })
    }

    fn value(&self, name: &str) -> &str {
        match name {
            "age" => &self.age,
            "bp" => &self.bp,
            "sg" => &self.sg,
            "al" => &self.al,
            "su" => &self.su,
            "rbc" => &self.rbc,
            "pc" => &self.pc,
            "pcc" => &self.pcc,
            "ba" => &self.ba,
            "htn" => &self.htn,
            _ => "",
        }
    }
}

fn parse_number(field: &'static str, raw: &str) -> Result<f64, ApiError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::Malformed {
            field,
            expected: "a number",
            value: raw.to_string(),
        })
}

fn parse_level(field: &'static str, raw: &str) -> Result<u8, ApiError> {
    raw.trim().parse::<u8>().map_err(|_| ApiError::Malformed {
        field,
        expected: "a whole number from 0 to 5",
        value: raw.to_string(),
    })
}

/// What to show under the form.
#[derive(Debug, Clone)]
pub enum Outcome {
    Prediction(Prediction),
    Error(String),
}

pub fn render(values: &FormInput, outcome: Option<&Outcome>) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(HEAD);
    html.push_str(concat!(
        "<main>\n",
        "<h1>Chronic Kidney Disease Prediction</h1>\n",
        "<p>Enter patient information to predict CKD risk.</p>\n",
        "<form method=\"post\" action=\"/predict\">\n",
        "<div class=\"columns\">\n",
        "<section>\n<h2>Patient Information</h2>\n",
    ));

    for field in &NUMERIC_FIELDS[..3] {
        html.push_str(&number_input(field, values.value(field.name)));
    }
    for field in &NUMERIC_FIELDS[3..] {
        html.push_str(&select(field.name, field.label, &LEVELS, values.value(field.name)));
    }

    html.push_str("</section>\n<section>\n<h2>Additional Parameters</h2>\n");
    for field in &CATEGORICAL_FIELDS {
        html.push_str(&categorical_select(field, values.value(field.name)));
    }
    html.push_str(concat!(
        "</section>\n</div>\n",
        "<button type=\"submit\">Predict</button>\n",
        "</form>\n",
    ));

    if let Some(outcome) = outcome {
        html.push_str(&result_section(outcome));
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn number_input(field: &NumericField, value: &str) -> String {
    format!(
        "<label>{label}\n<input type=\"number\" name=\"{name}\" id=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\" required>\n</label>\n",
        label = escape_html(field.label),
        name = field.name,
        min = field.min,
        max = field.max,
        step = field.step,
        value = escape_html(value),
    )
}

fn categorical_select(field: &CategoricalField, selected: &str) -> String {
    select(field.name, field.label, field.options, selected)
}

fn select(name: &str, label: &str, options: &[&str], selected: &str) -> String {
    let mut out = format!(
        "<label>{}\n<select name=\"{name}\" id=\"{name}\">\n",
        escape_html(label)
    );
    for option in options {
        let mark = if *option == selected { " selected" } else { "" };
        out.push_str(&format!(
            "<option value=\"{v}\"{mark}>{v}</option>\n",
            v = escape_html(option)
        ));
    }
    out.push_str("</select>\n</label>\n");
    out
}

fn result_section(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Prediction(p) => {
            let class = match p.label {
                RiskLabel::Elevated => "result high",
                RiskLabel::Low => "result low",
            };
            format!(
                concat!(
                    "<hr>\n<section class=\"{class}\">\n",
                    "<h2>Prediction Result</h2>\n",
                    "<p class=\"headline\">{headline}</p>\n",
                    "<p>Confidence: {confidence:.2}%</p>\n",
                    "</section>\n<hr>\n",
                    "<p class=\"disclaimer\">{disclaimer}</p>\n",
                ),
                class = class,
                headline = p.label.headline(),
                confidence = p.confidence * 100.0,
                disclaimer = DISCLAIMER,
            )
        }
        Outcome::Error(message) => format!(
            "<hr>\n<section class=\"result error\">\n<h2>Could not make a prediction</h2>\n<p>{}</p>\n</section>\n",
            escape_html(message)
        ),
    }
}

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const HEAD: &str = concat!(
    "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n",
    "<meta charset=\"utf-8\">\n",
    "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n",
    "<title>CKD Risk Prediction</title>\n",
    "<style>\n",
    "body { font-family: sans-serif; margin: 2rem auto; max-width: 56rem; padding: 0 1rem; }\n",
    ".columns { display: grid; grid-template-columns: 1fr 1fr; gap: 2rem; }\n",
    "label { display: block; margin-bottom: 0.75rem; }\n",
    "input, select { display: block; width: 100%; padding: 0.3rem; }\n",
    ".result.high .headline, .result.error { color: #b00020; }\n",
    ".result.low .headline { color: #1b5e20; }\n",
    ".disclaimer { font-size: 0.85rem; color: #555; }\n",
    "</style>\n</head>\n<body>\n",
);
