//! Parsing of raw LLM-as-judge output into scores.
//!
//! The judge is asked to answer with `<score>N</score>` and its reasoning
//! in `<thoughts>...</thoughts>`. Some models wrap the answer in a code
//! fence or reply with a JSON object instead; both are accepted.

use crate::error::{Result, ScorecardError};
use serde::{Deserialize, Serialize};

/// Score and reasoning extracted from one judge response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Raw score, not yet validated against any criterion domain.
    pub score: f64,
    /// The judge's explanation, empty if none was given.
    pub thoughts: String,
}

/// Parse a judge response.
pub fn parse_verdict(response: &str) -> Result<JudgeVerdict> {
    let body = strip_code_fence(response);

    if let Some(raw_score) = extract_tag(body, "score") {
        let score = parse_score(&raw_score, response)?;
        let thoughts = extract_tag(body, "thoughts").unwrap_or_default();
        return Ok(JudgeVerdict { score, thoughts });
    }

    if let Some(json) = extract_json(body) {
        #[derive(Deserialize)]
        struct RawVerdict {
            score: serde_json::Value,
            #[serde(default, alias = "explanation")]
            thoughts: String,
        }

        let raw: RawVerdict = serde_json::from_str(json).map_err(|e| {
            ScorecardError::JudgeParse(format!(
                "invalid verdict JSON: {}. Response: {}",
                e, response
            ))
        })?;
        let score = match raw.score {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|s: &f64| s.is_finite())
        .ok_or_else(|| {
            ScorecardError::JudgeParse(format!("score is not a number. Response: {}", response))
        })?;
        return Ok(JudgeVerdict {
            score,
            thoughts: raw.thoughts,
        });
    }

    Err(ScorecardError::JudgeParse(format!(
        "no <score> tag found. Response: {}",
        response
    )))
}

fn parse_score(raw: &str, response: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| {
            ScorecardError::JudgeParse(format!(
                "score '{}' is not a number. Response: {}",
                raw.trim(),
                response
            ))
        })
}

/// Content between the outermost `<tag>` and its last `</tag>`, trimmed.
///
/// Using the last closing tag keeps nested same-name tags inside the value.
fn extract_tag(text: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = text.find(&open)? + open.len();
    let end = text.rfind(&close)?;
    if end < start {
        return None;
    }
    Some(text[start..end].trim().to_string())
}

fn strip_code_fence(response: &str) -> &str {
    let response = response.trim();
    if !response.starts_with("```") {
        return response;
    }
    let start = response.find('\n').map(|n| n + 1).unwrap_or(3);
    match response.rfind("```") {
        Some(end) if end > start => response[start..end].trim(),
        _ => response,
    }
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
