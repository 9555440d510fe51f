use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static METRIC_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_]+$").expect("metric name pattern is valid"));

/// Metrics scored when the caller does not choose any.
pub const DEFAULT_METRICS: [&str; 4] = [
    "skills_match",
    "relevant_experience",
    "education",
    "soft_skills",
];

/// Inputs of one analysis call. Fields are private so a built request
/// cannot be altered on its way to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    job_description: String,
    cv_text: String,
    selected_metrics: Vec<String>,
}

impl AnalysisRequest {
    /// An empty `selected_metrics` falls back to [`DEFAULT_METRICS`].
    /// Blank and duplicate metric names are dropped, order is kept.
    pub fn new(job_description: String, cv_text: String, selected_metrics: Vec<String>) -> Self {
        let mut metrics: Vec<String> = Vec::new();
        for m in selected_metrics {
            let m = m.trim().to_string();
            if !m.is_empty() && !metrics.contains(&m) {
                metrics.push(m);
            }
        }
        if metrics.is_empty() {
            metrics = DEFAULT_METRICS.iter().map(|m| m.to_string()).collect();
        }

        Self {
            job_description,
            cv_text,
            selected_metrics: metrics,
        }
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn cv_text(&self) -> &str {
        &self.cv_text
    }

    pub fn selected_metrics(&self) -> &[String] {
        &self.selected_metrics
    }
}

/// The fit report returned by the model, validated against the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_score: u32, // 0 – 100
    pub metrics: BTreeMap<String, u32>,
    pub candidate_summary: String,
    pub analysis: String,
}

impl AnalysisResult {
    /// Metric names from `selected` missing in this result.
    pub fn missing_metrics<'a>(&self, selected: &'a [String]) -> Vec<&'a str> {
        selected
            .iter()
            .filter(|m| !self.metrics.contains_key(m.as_str()))
            .map(|m| m.as_str())
            .collect()
    }

    /// Scores in display order: `selected` metrics first, in the order given,
    /// then any extra metrics the model returned.
    pub fn metrics_in_order<'a>(&'a self, selected: &'a [String]) -> Vec<(&'a str, u32)> {
        let mut ordered: Vec<(&str, u32)> = selected
            .iter()
            .filter_map(|m| self.metrics.get(m).map(|&score| (m.as_str(), score)))
            .collect();
        ordered.extend(
            self.metrics
                .iter()
                .filter(|(m, _)| !selected.contains(m))
                .map(|(m, &score)| (m.as_str(), score)),
        );
        ordered
    }
}

/// Colour band used when a score is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Red,
    Yellow,
    Blue,
    Green,
}

impl ScoreBand {
    pub fn for_score(score: u32) -> Self {
        match score {
            0..=29 => ScoreBand::Red,
            30..=49 => ScoreBand::Yellow,
            50..=79 => ScoreBand::Blue,
            _ => ScoreBand::Green,
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            ScoreBand::Red => "#FF4136",
            ScoreBand::Yellow => "#FFDC00",
            ScoreBand::Blue => "#0074D9",
            ScoreBand::Green => "#2ecc40",
        }
    }
}

/// Metric keys are lowercase ASCII letters, digits and underscores.
pub fn is_valid_metric_name(metric: &str) -> bool {
    METRIC_NAME.is_match(metric)
}

/// Human label for a metric key, e.g. `skills_match` → "Skills Match".
pub fn metric_label(metric: &str) -> String {
    match metric {
        "skills_match" => "Skills Match".to_string(),
        "relevant_experience" => "Relevant Experience".to_string(),
        "education" => "Relevant Education".to_string(),
        "soft_skills" => "Soft Skills".to_string(),
        other => other
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" "),
    }
}

/// Collapses every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn save_json<T: Serialize>(value: &T, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_json(path: &Path) -> anyhow::Result<AnalysisResult> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
