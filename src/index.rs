use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Extract locators from index file text.
///
/// One locator per line; surrounding whitespace is trimmed, and blank lines
/// and lines starting with `#` are skipped.
pub fn parse_index(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read an index file, which must be valid UTF-8.
///
/// # Errors
/// Returns an error if the file cannot be read or is not UTF-8.
pub fn read_index(path: &Path) -> Result<Vec<String>> {
    let bytes = fs::read(path).with_context(|| format!("cannot read index {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("index {} is not valid UTF-8", path.display()))?;
    Ok(parse_index(&text))
}
