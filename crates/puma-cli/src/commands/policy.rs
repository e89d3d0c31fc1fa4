//! Policy file commands.

use anyhow::{Context, Result};
use puma_pdp::{PolicyDocument, PolicySource};

/// Parses a policy file and prints its id and remote references.
pub fn check(file: &str, expected_id: Option<&str>) -> Result<()> {
    let text = PolicySource::file(file).read()?;
    let document = match expected_id {
        Some(id) => PolicyDocument::parse_expecting(text, id),
        None => PolicyDocument::parse(text),
    }
    .with_context(|| format!("Invalid policy file {file}"))?;

    println!("Policy id: {}", document.id());
    println!("Kind: {:?}", document.kind());
    if document.remote_references().is_empty() {
        println!("Remote references: none");
    } else {
        println!("Remote references:");
        for reference in document.remote_references() {
            println!("  {reference}");
        }
    }
    Ok(())
}
