use axum::{
    extract::{Multipart, State},
    response::Html,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::pipeline::{run_pipeline, PipelineError};
use crate::analysis::provider::{MistralProvider, AVAILABLE_MODELS};
use crate::config::DEFAULT_MODEL;
use crate::cv::structurer::StructuredCv;
use crate::errors::AppError;
use crate::extraction::{DocumentExtractor, StageFailure};
use crate::models::report::{
    collapse_whitespace, metric_label, AnalysisResult, ScoreBand, DEFAULT_METRICS,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BandView {
    pub band: ScoreBand,
    pub color: &'static str,
}

impl BandView {
    fn for_score(score: u32) -> Self {
        let band = ScoreBand::for_score(score);
        Self {
            band,
            color: band.hex(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricView {
    pub metric: String,
    pub label: String,
    pub score: u32,
    #[serde(flatten)]
    pub band: BandView,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub result: AnalysisResult,
    pub score_band: BandView,
    pub metric_bands: Vec<MetricView>,
    pub analysis_display: String,
    pub structured_cv: StructuredCv,
    pub extraction_method: &'static str,
    pub extraction_failures: Vec<StageFailure>,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: &'static [&'static str],
    pub default_model: &'static str,
    pub default_metrics: &'static [&'static str],
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE_HTML)
}

/// GET /api/v1/models
pub async fn handle_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: &AVAILABLE_MODELS,
        default_model: DEFAULT_MODEL,
        default_metrics: &DEFAULT_METRICS,
    })
}

/// POST /api/v1/analyze
///
/// Multipart fields: `job_description` (text), `cv` (file), `metrics`
/// (optional, comma separated).
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let mut job_description = String::new();
    let mut document: Option<Vec<u8>> = None;
    let mut metrics: Vec<String> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "job_description" => {
                job_description = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed job description: {e}")))?;
            }
            "cv" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    warn!("Failed to read upload bytes: {e}");
                    AppError::Validation("Failed to read file data.".to_string())
                })?;
                info!(filename = %filename, bytes = bytes.len(), "CV received");
                document = Some(bytes.to_vec());
            }
            "metrics" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed metrics: {e}")))?;
                metrics.extend(raw.split(',').map(str::to_string));
            }
            other => warn!(field = other, "Ignoring unknown upload field"),
        }
    }

    if job_description.trim().is_empty() {
        return Err(PipelineError::EmptyJobDescription.into());
    }
    let document = match document {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(PipelineError::MissingDocument.into()),
    };

    let provider_config = state.provider_config()?;
    let extractor = DocumentExtractor::for_backend(
        state.config.extraction_backend,
        &state.config.ocr_language,
        &provider_config,
    )?;
    let provider = MistralProvider::new();

    let output = run_pipeline(
        &job_description,
        document,
        metrics,
        &extractor,
        &provider,
        &provider_config,
    )
    .await?;

    let result = output.result;
    let metric_bands = result
        .metrics_in_order(&output.selected_metrics)
        .into_iter()
        .map(|(metric, score)| MetricView {
            metric: metric.to_string(),
            label: metric_label(metric),
            score,
            band: BandView::for_score(score),
        })
        .collect();

    Ok(Json(AnalyzeResponse {
        analysis_id: output.analysis_id,
        score_band: BandView::for_score(result.overall_score),
        metric_bands,
        analysis_display: collapse_whitespace(&result.analysis),
        structured_cv: output.structured_cv,
        extraction_method: output.extraction_method,
        extraction_failures: output.extraction_failures,
        analyzed_at: Utc::now(),
        result,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Upload page
// ────────────────────────────────────────────────────────────────────────────

const UPLOAD_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>CV Analyzer</title>
  <style>
    * { box-sizing: border-box; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
      background: #fafaf9; color: #1c1917; max-width: 760px; margin: 0 auto; padding: 24px;
    }
    h1 { font-size: 24px; margin-bottom: 4px; }
    p.sub { color: #78716c; font-size: 14px; margin-top: 0; }
    label { display: block; font-weight: 600; margin: 16px 0 6px; }
    textarea { width: 100%; min-height: 180px; padding: 10px; border: 1px solid #d6d3d1; border-radius: 8px; }
    .metrics label { display: inline-block; font-weight: 400; margin-right: 16px; }
    button {
      margin-top: 20px; padding: 12px 20px; border: none; border-radius: 8px;
      background: #0074D9; color: white; font-size: 16px; cursor: pointer;
    }
    button:disabled { opacity: 0.5; cursor: not-allowed; }
    .error { color: #dc2626; margin-top: 16px; white-space: pre-wrap; }
    .score { font-size: 48px; font-weight: 700; margin: 24px 0 8px; }
    .metric { display: flex; justify-content: space-between; padding: 6px 0; border-bottom: 1px solid #e7e5e4; }
  </style>
</head>
<body>
  <h1>CV Analyzer</h1>
  <p class="sub">Compare a candidate's CV against a job description.</p>

  <form id="form">
    <label for="jd">Job description</label>
    <textarea id="jd" name="job_description" placeholder="Paste the job description here..."></textarea>

    <label for="cv">Candidate CV (PDF)</label>
    <input type="file" id="cv" name="cv" accept="application/pdf">

    <label>Metrics</label>
    <div class="metrics">
      <label><input type="checkbox" value="skills_match" checked> Skills Match</label>
      <label><input type="checkbox" value="relevant_experience" checked> Relevant Experience</label>
      <label><input type="checkbox" value="education" checked> Relevant Education</label>
      <label><input type="checkbox" value="soft_skills" checked> Soft Skills</label>
    </div>

    <button type="submit" id="submit">Analyze candidate</button>
  </form>

  <div class="error" id="error"></div>
  <div id="report"></div>

  <script>
    const form = document.getElementById('form');
    const errorBox = document.getElementById('error');
    const report = document.getElementById('report');
    const submit = document.getElementById('submit');

    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      errorBox.textContent = '';
      report.innerHTML = '';

      const jd = document.getElementById('jd').value;
      const file = document.getElementById('cv').files[0];
      if (!jd.trim()) { errorBox.textContent = 'Please enter a job description.'; return; }
      if (!file) { errorBox.textContent = 'Please upload a CV file.'; return; }

      const metrics = Array.from(document.querySelectorAll('.metrics input:checked')).map(i => i.value);
      const data = new FormData();
      data.append('job_description', jd);
      data.append('cv', file);
      data.append('metrics', metrics.join(','));

      submit.disabled = true;
      submit.textContent = 'Analyzing...';
      try {
        const res = await fetch('/api/v1/analyze', { method: 'POST', body: data });
        const body = await res.json();
        if (!res.ok) { errorBox.textContent = body.error.message; return; }
        render(body);
      } catch (e) {
        errorBox.textContent = 'Request failed: ' + e;
      } finally {
        submit.disabled = false;
        submit.textContent = 'Analyze candidate';
      }
    });

    function render(body) {
      const score = document.createElement('div');
      score.className = 'score';
      score.style.color = body.score_band.color;
      score.textContent = body.result.overall_score + '%';
      report.appendChild(score);

      for (const m of body.metric_bands) {
        const row = document.createElement('div');
        row.className = 'metric';
        const name = document.createElement('span');
        name.textContent = m.label;
        const value = document.createElement('strong');
        value.style.color = m.color;
        value.textContent = m.score + '%';
        row.append(name, value);
        report.appendChild(row);
      }

      const summary = document.createElement('h3');
      summary.textContent = body.result.candidate_summary;
      const analysis = document.createElement('p');
      analysis.textContent = body.analysis_display;
      report.append(summary, analysis);
    }
  </script>
</body>
</html>
"#;
