// Prompt constants for provider-assisted match scoring.
// Each provider's wire format decides where the system prompt goes.

/// System prompt for profile-to-listing compatibility scoring.
pub const MATCH_SYSTEM: &str = "You are an expert technical recruiter. \
    You assess how well a candidate's skills cover a job listing's requirements. \
    You MUST respond with valid JSON only: an object with the keys \
    'score' (integer from 0 to 100) and 'summary' (3 to 5 sentences naming the \
    strongest overlaps and the most important gaps). \
    Do NOT include any text outside the JSON object.";

pub const MATCH_PROMPT_TEMPLATE: &str = "\
Candidate skills:
{profile}

Job listing requirements:
{listing}

Evaluate how well the candidate fits the listing and return only the JSON object.";

/// Renders the match prompt. Empty sets are spelled out rather than left blank.
pub fn render_match_prompt(profile: &str, listing: &str) -> String {
    MATCH_PROMPT_TEMPLATE
        .replace("{profile}", or_none(profile))
        .replace("{listing}", or_none(listing))
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none)"
    } else {
        text
    }
}
