// All LLM prompt text for candidate analysis.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{HR_ANALYST_PERSONA, JSON_ONLY_INSTRUCTION};
use crate::models::report::AnalysisRequest;

pub const ANALYSIS_GUIDELINES: &str = "ANALYSIS GUIDELINES:
1. Be objective and fair - don't artificially inflate or deflate scores
2. Consider both direct matches and transferable skills
3. Weight experience more heavily than education for senior roles
4. Consider industry context and role requirements
5. Acknowledge potential for growth and learning";

pub const SCORING_BANDS: &str = "SCORING GUIDELINES:
- 90-100: Exceptional fit, exceeds requirements
- 80-89: Strong fit, meets all key requirements
- 70-79: Good fit, meets most requirements with minor gaps
- 60-69: Moderate fit, meets some requirements, needs development
- 50-59: Limited fit, significant gaps but potential
- Below 50: Poor fit, major misalignment";

/// Scoring criterion shown to the model for a metric.
fn metric_criterion(metric: &str) -> String {
    match metric {
        "skills_match" => "Direct technical/functional skill alignment".to_string(),
        "relevant_experience" => {
            "Industry/role-specific experience duration and quality".to_string()
        }
        "education" => "Degree relevance, certifications, continuous learning".to_string(),
        "soft_skills" => "Communication, leadership, adaptability, cultural fit".to_string(),
        other => format!("How well the candidate meets the job's {} needs", other.replace('_', " ")),
    }
}

/// Builds the single analysis prompt: persona, rubric, both documents and the
/// exact JSON shape expected back.
pub fn build_analysis_prompt(request: &AnalysisRequest) -> String {
    let metrics = request.selected_metrics();

    let criteria = metrics
        .iter()
        .map(|m| format!("- {m} (0-100): {}", metric_criterion(m)))
        .collect::<Vec<_>>()
        .join("\n");

    let schema_metrics = metrics
        .iter()
        .map(|m| format!("        \"{m}\": <integer 0-100>"))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        r#"{HR_ANALYST_PERSONA}

{ANALYSIS_GUIDELINES}

SCORING CRITERIA:
- overall_score: Weighted average considering role seniority and requirements
{criteria}

{SCORING_BANDS}

Job Description:
{job_description}

Candidate CV (Structured):
{cv_text}

Return ONLY a valid JSON object with these exact fields:
{{
    "overall_score": <integer 0-100>,
    "metrics": {{
{schema_metrics}
    }},
    "candidate_summary": "<2-3 sentence summary of candidate background>",
    "analysis": "<detailed paragraph explaining the overall score, key strengths, areas of concern, and specific reasoning for each metric score>"
}}

Focus on these metrics: {metric_list}

{JSON_ONLY_INSTRUCTION}"#,
        job_description = request.job_description(),
        cv_text = request.cv_text(),
        metric_list = metrics.join(", "),
    )
}
