// LLM prompt constants for the candidate review.

/// System prompt for the final candidate review. Enforces JSON-only output.
pub const REVIEW_SYSTEM: &str = "You are a senior technical recruiter at an IT staffing firm. \
    You review a candidate CV against a job offer or appel d'offre (RFP) and give a final, \
    human-readable verdict. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Review prompt template.
/// Replace: {preliminary_json}, {job_text}, {cv_text}
pub const REVIEW_PROMPT_TEMPLATE: &str = r#"An automated pre-screening produced this preliminary score (keyword coverage and semantic similarity):
{preliminary_json}

Treat it as a hint only. Read both documents and decide the final score yourself.

Return a JSON object with this EXACT schema:
{
  "final_score": 72,
  "confidence": "high | medium | low",
  "summary": "2-3 sentences on overall fit",
  "strengths": ["..."],
  "weaknesses": ["..."],
  "matched_skills": ["skills required by the offer that the candidate clearly has"],
  "missing_skills": ["skills required by the offer that are absent or weak"],
  "recommendation": "one sentence: shortlist, interview, or reject, and why"
}

SCORING GUIDE:
- 85-100: meets every hard requirement with directly relevant recent experience
- 70-84: meets most hard requirements, minor gaps
- 50-69: partial fit, significant gaps that training or ramp-up could close
- 0-49: poor fit

Write the text fields in the language of the job offer.

JOB OFFER:
{job_text}

CANDIDATE CV:
{cv_text}"#;
