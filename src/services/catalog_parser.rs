//! Service catalog parsing.
//!
//! The backend describes services as repeated blocks of
//! `Service Name:` / `Port:` / `Functionality Summary:` lines. Parsing is
//! split into a lenient scan that never fails and a strict filter that keeps
//! only records with a usable port.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::domain::errors::{QaError, QaResult};
use crate::domain::models::ServiceDescriptor;

const NAME_KEY: &str = "Service Name:";
const PORT_KEY: &str = "Port:";
const FUNCTIONALITY_KEY: &str = "Functionality Summary:";

/// Phrase the backend uses when the notes describe no UDP service.
pub const NO_SERVICES_PHRASE: &str = "no clear services can be identified";

/// Functionality recorded when a block has no summary line.
pub const UNKNOWN_FUNCTIONALITY: &str = "N/A";

/// One catalog block as written, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    /// 1-based position of the block in the source text
    pub position: usize,
    pub name: String,
    /// `None` when the port line is missing or not an integer
    pub port: Option<i64>,
    pub functionality: Option<String>,
}

impl CatalogRecord {
    fn new(position: usize, name: &str) -> Self {
        let name = if name.is_empty() {
            format!("udp_service_{position}")
        } else {
            name.to_string()
        };
        Self {
            position,
            name,
            port: None,
            functionality: None,
        }
    }

    /// The descriptor for this record, if its port is a valid UDP port.
    pub fn to_descriptor(&self) -> Option<ServiceDescriptor> {
        let port = self.port.and_then(|p| u16::try_from(p).ok()).filter(|p| *p > 0)?;
        Some(ServiceDescriptor::new(
            self.name.clone(),
            port,
            self.functionality
                .clone()
                .unwrap_or_else(|| UNKNOWN_FUNCTIONALITY.to_string()),
        ))
    }
}

fn value_after<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key).map(str::trim)
}

/// Scan `text` into records without rejecting anything.
///
/// A name line always starts a new record. Port and functionality lines seen
/// before the first name line are ignored.
pub fn parse_records(text: &str) -> Vec<CatalogRecord> {
    let mut records = Vec::new();
    let mut current: Option<CatalogRecord> = None;

    for line in text.lines() {
        let line = line.trim_start();

        if let Some(name) = value_after(line, NAME_KEY) {
            records.extend(current.take());
            current = Some(CatalogRecord::new(records.len() + 1, name));
        } else if let Some(port) = value_after(line, PORT_KEY) {
            if let Some(record) = current.as_mut() {
                record.port = port.parse::<i64>().ok();
                if record.port.is_none() {
                    warn!(service = %record.name, value = port, "unparseable port in catalog");
                }
            }
        } else if let Some(summary) = value_after(line, FUNCTIONALITY_KEY) {
            if let Some(record) = current.as_mut() {
                record.functionality = Some(summary.to_string());
            }
        }
    }
    records.extend(current);

    records
}

/// Keep only records whose port is a positive integer in the UDP range.
///
/// Source order is preserved. Records whose artifact stem repeats an earlier
/// one are dropped, since both would write to the same artifact paths.
pub fn filter_valid(records: &[CatalogRecord]) -> Vec<ServiceDescriptor> {
    let mut stems = HashSet::new();
    records
        .iter()
        .filter_map(|record| {
            let Some(descriptor) = record.to_descriptor() else {
                debug!(service = %record.name, port = ?record.port, "dropping catalog record without a valid port");
                return None;
            };
            if !stems.insert(descriptor.artifact_stem()) {
                warn!(
                    service = %descriptor.name,
                    port = descriptor.port,
                    position = record.position,
                    "dropping duplicate catalog record"
                );
                return None;
            }
            Some(descriptor)
        })
        .collect()
}

/// Parse backend catalog text into the usable service list.
///
/// # Errors
/// `CatalogParseEmpty` when the backend reported no services or no record
/// survives validation.
pub fn parse_catalog(text: &str) -> QaResult<Vec<ServiceDescriptor>> {
    if text.to_lowercase().contains(NO_SERVICES_PHRASE) {
        return Err(QaError::CatalogParseEmpty);
    }

    let records = parse_records(text);
    let services = filter_valid(&records);
    debug!(records = records.len(), valid = services.len(), "catalog parsed");

    if services.is_empty() {
        return Err(QaError::CatalogParseEmpty);
    }
    Ok(services)
}
