//! Recovering structured data from free-text model replies.
//!
//! Models are asked to answer with JSON only, but routinely wrap it in prose or
//! markdown fences. `extract_json` is a heuristic: it assumes at most one
//! top-level object per reply and takes the span from the first `{` to the
//! last `}`. Callers must treat `None` as a failed classification or
//! generation, never as an empty result.

use serde_json::Value;

/// Parse the object spanning the first `{` to the last `}` of `text`.
///
/// On failure, markdown fence markers are stripped from that span and the parse
/// is retried once. Returns `None` if neither attempt yields a JSON object.
pub fn extract_json(text: &str) -> Option<Value> {
    let candidate = brace_span(text)?;

    if let Some(value) = parse_object(candidate) {
        return Some(value);
    }

    let unfenced = candidate.replace("```json", "").replace("```", "");
    let retry = brace_span(&unfenced)?;
    let value = parse_object(retry);
    if value.is_none() {
        tracing::debug!("No JSON object recoverable from {} chars of model output", text.len());
    }
    value
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Body of the outermost markdown fenced block in a model reply.
///
/// Everything up to and including the first fence line is dropped, as is the
/// last fence line and anything after it, so prose around the block never
/// reaches the file. Fences nested inside the block are kept. A reply without
/// fences is returned as is.
///
/// ```
/// use kiln_engine::llm::strip_code_fences;
///
/// let reply = "Here it is:\n```python\nprint('hi')\n```\nEnjoy!";
/// assert_eq!(strip_code_fences(reply), "print('hi')\n");
/// ```
pub fn strip_code_fences(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().collect();
    let is_fence = |line: &&str| line.trim_start().starts_with("```");

    let body = match lines.iter().position(is_fence) {
        Some(open) => {
            let rest = &lines[open + 1..];
            match rest.iter().rposition(is_fence) {
                Some(close) => &rest[..close],
                None => rest,
            }
        }
        None => &lines[..],
    };

    if body.is_empty() {
        return String::new();
    }

    let mut out = body.join("\n");
    out.push('\n');
    out
}
