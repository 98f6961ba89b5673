//! Contact cache persistence.
//!
//! The materialized contact list is written to a JSON file after every
//! import so a restart (or a scheduled send) does not need a fresh import.
//! An absent cache is an empty list, not an error. The in-memory list stays
//! authoritative for the running session when a write fails.

use anyhow::{Context, Result};
use std::path::Path;

use crate::models::Contact;

pub fn save_contacts(path: &Path, contacts: &[Contact]) -> Result<()> {
    let json = serde_json::to_string_pretty(contacts)?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write contact cache: {}", path.display()))?;
    Ok(())
}

pub fn load_contacts(path: &Path) -> Result<Vec<Contact>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read contact cache: {}", path.display()))?;
    let contacts: Vec<Contact> = serde_json::from_str(&json)
        .with_context(|| format!("contact cache is not valid JSON: {}", path.display()))?;
    Ok(contacts)
}
