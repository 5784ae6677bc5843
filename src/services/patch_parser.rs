//! Extraction of replacement artifacts from a repair response.
//!
//! The preferred format is a JSON envelope
//! `{"updated_mock": string|null, "updated_test": string|null}`, optionally
//! fenced or surrounded by prose. Responses without a valid envelope fall
//! back to the `Updated Mock Code:` / `Updated Test Script Code:` tags.

use serde::Deserialize;
use tracing::debug;

use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::{PatchBlock, PatchTarget};
use crate::domain::text::{first_fenced_block, strip_code_fences};

pub const MOCK_MARKER: &str = "Updated Mock Code:";
pub const TEST_MARKER: &str = "Updated Test Script Code:";

#[derive(Debug, Deserialize)]
struct RepairEnvelope {
    #[serde(default)]
    updated_mock: Option<String>,
    #[serde(default)]
    updated_test: Option<String>,
}

/// Patches proposed by `response`, mock first.
///
/// # Errors
/// `PatchUnparseable` when neither format yields a non-empty section.
pub fn parse_patches(response: &str) -> QaResult<Vec<PatchBlock>> {
    if let Some(envelope) = parse_envelope(response) {
        let patches = collect([
            (PatchTarget::Mock, envelope.updated_mock),
            (PatchTarget::Test, envelope.updated_test),
        ]);
        debug!(count = patches.len(), format = "json", "repair patches parsed");
        return non_empty(patches);
    }

    let patches = collect([
        (PatchTarget::Mock, tagged_section(response, MOCK_MARKER, TEST_MARKER)),
        (PatchTarget::Test, tagged_section(response, TEST_MARKER, MOCK_MARKER)),
    ]);
    debug!(count = patches.len(), format = "tags", "repair patches parsed");
    non_empty(patches)
}

fn non_empty(patches: Vec<PatchBlock>) -> QaResult<Vec<PatchBlock>> {
    if patches.is_empty() {
        Err(QaError::PatchUnparseable)
    } else {
        Ok(patches)
    }
}

fn collect<const N: usize>(sections: [(PatchTarget, Option<String>); N]) -> Vec<PatchBlock> {
    sections
        .into_iter()
        .filter_map(|(target, section)| {
            let code = first_fenced_block(&section?);
            (!code.is_empty()).then(|| PatchBlock::new(target, code))
        })
        .collect()
}

/// The envelope, tried on the fence-stripped reply and then on the outermost
/// `{...}` span. Objects carrying neither key are not envelopes.
fn parse_envelope(response: &str) -> Option<RepairEnvelope> {
    if let Some(envelope) = envelope_from(&strip_code_fences(response)) {
        return Some(envelope);
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    envelope_from(&response[start..=end])
}

fn envelope_from(text: &str) -> Option<RepairEnvelope> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;
    if !object.contains_key("updated_mock") && !object.contains_key("updated_test") {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Text after `marker`, cut at `other` if it follows.
fn tagged_section(response: &str, marker: &str, other: &str) -> Option<String> {
    let (_, after) = response.split_once(marker)?;
    let section = after.split_once(other).map_or(after, |(before, _)| before);
    Some(section.to_string())
}
