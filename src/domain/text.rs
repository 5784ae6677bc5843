//! Text helpers shared by the backend adapter, prompt builder and parsers.

const FENCE: &str = "```";

/// Strip exactly one leading fence (optionally language-tagged) and one
/// trailing fence from a backend reply.
///
/// Text without fences is returned trimmed and otherwise unchanged.
pub fn strip_code_fences(text: &str) -> String {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix(FENCE) {
        body = match rest.split_once('\n') {
            Some((tag, after)) if is_language_tag(tag) => after,
            _ => rest,
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix(FENCE) {
        body = rest;
    }

    body.trim().to_string()
}

/// Content of the first fenced block in `text`, or the whole text trimmed
/// when it carries no fence.
///
/// Repair sections often wrap code in prose ("Here is the fix: ```...```");
/// only the code is wanted.
pub fn first_fenced_block(text: &str) -> String {
    let Some(start) = text.find(FENCE) else {
        return text.trim().to_string();
    };
    let after_open = &text[start + FENCE.len()..];
    let body = match after_open.split_once('\n') {
        Some((tag, after)) if is_language_tag(tag) => after,
        _ => after_open,
    };
    match body.find(FENCE) {
        Some(end) => body[..end].trim().to_string(),
        None => body.trim().to_string(),
    }
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.'))
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}\n\n[TRUNCATED]", &text[..byte_idx]),
        None => text.to_string(),
    }
}
