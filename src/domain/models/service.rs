use serde::{Deserialize, Serialize};

/// A UDP service identified in the QA notes.
///
/// Only descriptors with a positive port make it into the usable catalog;
/// they are never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Human-readable service name as written by the backend
    pub name: String,

    /// UDP port the mock listener binds and the test script targets
    pub port: u16,

    /// Short summary of the expected message interaction
    pub functionality: String,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, port: u16, functionality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port,
            functionality: functionality.into(),
        }
    }

    /// Filesystem-safe, lower-case variant of the name.
    ///
    /// Whitespace runs become `_`, anything outside `[a-z0-9_-]` is dropped.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.name.len());
        let mut pending_sep = false;
        for ch in self.name.trim().chars() {
            if ch.is_whitespace() {
                pending_sep = !slug.is_empty();
                continue;
            }
            let ch = ch.to_ascii_lowercase();
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                if pending_sep {
                    slug.push('_');
                    pending_sep = false;
                }
                slug.push(ch);
            }
        }
        if slug.is_empty() {
            format!("udp_service_{}", self.port)
        } else {
            slug
        }
    }

    /// Stem shared by every artifact of this service, e.g. `auth_udp_port5005`.
    pub fn artifact_stem(&self) -> String {
        format!("{}_port{}", self.slug(), self.port)
    }
}
