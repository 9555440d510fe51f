//! Response Parser: turns a free-form model reply into a validated `AnalysisResult`.
//!
//! Two tiers: strict decoding of the whole reply, then decoding of the span from
//! the first `{` to the last `}`. The span is greedy: braces in prose *outside*
//! the object (e.g. "use {x}" after the JSON) widen it and make tier two fail.
//! That is a known limitation; there is no smarter recovery.

use thiserror::Error;

use crate::models::report::AnalysisResult;

/// The reply could not be coerced into the result schema. Always carries the
/// raw reply for diagnostics.
#[derive(Debug, Clone, Error)]
#[error("Could not parse LLM response as JSON ({reason}). Raw output:\n{raw}")]
pub struct ParseFailure {
    pub raw: String,
    pub reason: String,
}

pub fn parse(raw: &str) -> Result<AnalysisResult, ParseFailure> {
    let decoded = match serde_json::from_str::<AnalysisResult>(raw.trim()) {
        Ok(result) => Ok(result),
        Err(strict_err) => match brace_span(raw) {
            Some(span) => serde_json::from_str::<AnalysisResult>(span).map_err(|e| e.to_string()),
            None => Err(strict_err.to_string()),
        },
    };

    let result = decoded.map_err(|reason| ParseFailure {
        raw: raw.to_string(),
        reason,
    })?;

    validate_ranges(&result).map_err(|reason| ParseFailure {
        raw: raw.to_string(),
        reason,
    })?;

    Ok(result)
}

/// First `{` through last `}`, inclusive.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn validate_ranges(result: &AnalysisResult) -> Result<(), String> {
    if result.overall_score > 100 {
        return Err(format!(
            "overall_score {} is outside 0-100",
            result.overall_score
        ));
    }
    if let Some((name, score)) = result.metrics.iter().find(|(_, s)| **s > 100) {
        return Err(format!("metric '{name}' score {score} is outside 0-100"));
    }
    Ok(())
}
