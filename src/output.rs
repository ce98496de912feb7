use crate::models::{ClassProbability, PredictionResult, Progress, ResponseScale};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Width of the bar charts in plain output
const BAR_WIDTH: usize = 20;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Answer count for one weight bucket, labelled with its option
#[derive(Debug, Serialize)]
pub struct BucketCount<'a> {
    pub label: &'a str,
    pub weight: u8,
    pub count: u32,
}

/// Everything the results view shows
#[derive(Debug, Serialize)]
pub struct ResultReport<'a> {
    pub career: &'a str,
    pub class_index: usize,
    pub answer_profile: Vec<BucketCount<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<&'a [ClassProbability]>,
}

impl<'a> ResultReport<'a> {
    pub fn new(
        result: &'a PredictionResult,
        scale: &'a ResponseScale,
        show_probabilities: bool,
    ) -> Self {
        let answer_profile = result
            .features
            .counts()
            .iter()
            .enumerate()
            .map(|(weight, &count)| BucketCount {
                label: scale
                    .options()
                    .iter()
                    .find(|o| o.weight as usize == weight)
                    .map(|o| o.label.as_str())
                    .unwrap_or("?"),
                weight: weight as u8,
                count,
            })
            .collect();

        let probabilities = if show_probabilities {
            result.probabilities.as_deref()
        } else {
            None
        };

        Self {
            career: &result.label,
            class_index: result.class_index,
            answer_profile,
            probabilities,
        }
    }
}

/// Render a result in the requested format
pub fn render_result(report: &ResultReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Plain => render_plain(report),
        OutputFormat::Json => render_json(report),
    }
}

/// Render a result as plain text with bar charts
fn render_plain(report: &ResultReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("🎯 Recommended Career: {}\n", report.career));

    if let Some(probabilities) = report.probabilities {
        out.push('\n');
        out.push_str("📊 CAREER MATCH\n");
        out.push_str("---------------\n");
        let width = probabilities.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
        for p in probabilities {
            out.push_str(&format!(
                "{:<width$} {} {:>5.1}%\n",
                p.label,
                bar(p.probability),
                p.probability * 100.0,
                width = width
            ));
        }
    }

    out.push('\n');
    out.push_str("📝 ANSWER PROFILE\n");
    out.push_str("-----------------\n");
    let total: u32 = report.answer_profile.iter().map(|b| b.count).sum();
    let width = report
        .answer_profile
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);
    for bucket in &report.answer_profile {
        let share = if total == 0 {
            0.0
        } else {
            bucket.count as f64 / total as f64
        };
        out.push_str(&format!(
            "{:<width$} {} {}\n",
            bucket.label,
            bar(share),
            bucket.count,
            width = width
        ));
    }

    out
}

/// Render a result as pretty JSON
fn render_json(report: &ResultReport) -> String {
    match serde_json::to_string_pretty(report) {
        Ok(json) => format!("{}\n", json),
        Err(e) => format!("Error serializing result to JSON: {}\n", e),
    }
}

fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

/// Text progress indicator shown above each question
pub fn progress_line(progress: Progress) -> String {
    format!(
        "[{}] {}/{}",
        bar(progress.fraction()),
        progress.answered,
        progress.total
    )
}
