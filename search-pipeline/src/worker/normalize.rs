use common::storage::types::resource_results::ResourceResults;
use tracing::warn;

/// Shapes raw model output into results. Output that does not parse, or parses
/// to nothing, becomes the labelled fallback payload instead of an error.
pub fn normalize_results(raw: &str) -> ResourceResults {
    match parse_results(raw) {
        Some(results) if !results.is_empty() => results,
        _ => {
            warn!(raw_len = raw.len(), "search output was not structured; using fallback");
            ResourceResults::fallback(raw.trim())
        }
    }
}

fn parse_results(raw: &str) -> Option<ResourceResults> {
    let body = strip_code_fence(raw.trim());
    if let Ok(results) = serde_json::from_str::<ResourceResults>(body) {
        return Some(results);
    }

    // Models sometimes wrap the object in prose; take the outermost braces.
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(body.get(start..=end)?).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = rest.split_once('\n').map_or(rest, |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
