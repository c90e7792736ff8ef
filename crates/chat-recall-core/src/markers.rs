//! Inline `{ref:N}` marker inspection.
//!
//! [`ResponseEngine::generate`](crate::engine::ResponseEngine::generate)
//! returns the generated text untouched, including markers that point at
//! no citation. These helpers let a caller check correspondence itself.

use crate::models::ChatResult;

const MARKER_OPEN: &str = "{ref:";

/// Ordinals of every well-formed `{ref:N}` marker in `text`, in order of
/// appearance (duplicates kept).
pub fn ref_markers(text: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(MARKER_OPEN) {
        let after = &rest[start + MARKER_OPEN.len()..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            if let Ok(n) = after[..digits].parse::<usize>() {
                found.push(n);
            }
        }
        rest = after;
    }

    found
}

/// Marker ordinals in the response that have no matching reference,
/// deduplicated, in order of first appearance.
pub fn unresolved_markers(result: &ChatResult) -> Vec<usize> {
    let mut missing: Vec<usize> = Vec::new();
    for n in ref_markers(&result.response) {
        let known = result.references.iter().any(|r| r.inline_position == n);
        if !known && !missing.contains(&n) {
            missing.push(n);
        }
    }
    missing
}
