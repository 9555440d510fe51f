// Shared prompt fragments used by every prompt sent through llm_client.
// Each module that needs the model defines its own prompts alongside it.

/// Appended to every prompt that expects a JSON reply.
pub const JSON_ONLY_INSTRUCTION: &str = "IMPORTANT: Respond ONLY with the JSON object. \
    No extra text, no markdown, no code blocks.";

/// Reviewer persona shared by analysis prompts.
pub const HR_ANALYST_PERSONA: &str = "You are an expert HR analyst with 15+ years of \
    experience in talent acquisition and recruitment. Your task is to provide an accurate, \
    unbiased assessment of candidate-job fit.";
