use serde::{Deserialize, Serialize};
use std::fmt;

/// Which artifact of an asset a patch replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchTarget {
    Mock,
    Test,
}

impl fmt::Display for PatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Full replacement content for one artifact, extracted from a repair response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchBlock {
    pub target: PatchTarget,
    pub content: String,
}

impl PatchBlock {
    pub fn new(target: PatchTarget, content: impl Into<String>) -> Self {
        Self {
            target,
            content: content.into(),
        }
    }
}
