//! Terminal output for training reports, predictions, and encoder dumps.

use std::path::Path;

use ckdrisk_model::{EncoderMapping, Prediction, TrainReport};

// ── Training ──

pub fn print_report(report: &TrainReport, model_dir: &Path) {
    println!("=== Training complete ===");
    println!("  {:<20} {}", "fitted rows", report.n_fit);
    println!("  {:<20} {}", "train accuracy", percent(report.train_accuracy));
    match report.test_accuracy {
        Some(acc) => println!(
            "  {:<20} {} ({} held out of {})",
            "holdout accuracy",
            percent(acc),
            report.n_test,
            report.n_train + report.n_test
        ),
        None => println!("  {:<20} (no holdout)", "holdout accuracy"),
    }
    println!();

    println!("Feature importances");
    for (column, importance) in &report.feature_importances {
        println!("  {:<20} {importance:.4}  {}", column, bar(*importance));
    }
    println!();
    println!("Artifacts written to {}", model_dir.display());
}

// ── Prediction ──

pub fn format_prediction(prediction: &Prediction) -> String {
    format!(
        "{}\nConfidence: {}\n  p(low) = {:.4}, p(elevated) = {:.4}\n",
        prediction.label.headline(),
        percent(prediction.confidence),
        prediction.probabilities[0],
        prediction.probabilities[1]
    )
}

// ── Encoders ──

pub fn format_encoders(encoders: &EncoderMapping) -> String {
    let mut out = String::new();
    for (column, encoder) in encoders.columns() {
        out.push_str(&format!(
            "Column: {column}\nClasses: {}\n\n",
            encoder.classes().join(", ")
        ));
    }
    out
}

/// `0.7340` → `73.40%`.
pub fn percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn bar(fraction: f64) -> String {
    let width = (fraction * 40.0).round().clamp(0.0, 40.0) as usize;
    "#".repeat(width)
}
