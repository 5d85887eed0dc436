//! YAML frontmatter parsing and rendering for note text
//!
//! A note carries frontmatter when its text starts with a `---` line and a later
//! line is exactly `---`. Everything between is YAML; everything after is the
//! body. This is what the in-memory vault uses to maintain its metadata cache
//! and to rewrite frontmatter in place.

use serde_json::Value;
use tracing::debug;

use crate::vault::Frontmatter;

/// A note split into frontmatter and body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Parsed YAML mapping, or None if the note has no frontmatter block
    pub frontmatter: Option<Frontmatter>,
    /// The text after the frontmatter block (or the entire text if there is none)
    pub body: String,
}

/// Parse YAML frontmatter from note text
///
/// # Format
/// ```markdown
/// ---
/// data:
///   - name: Ada
/// ---
/// Body goes here
/// ```
///
/// An empty block parses to an empty mapping. A block whose YAML is not a
/// mapping is treated as no frontmatter.
///
/// # Examples
/// ```
/// use data_entry::frontmatter::parse_frontmatter;
///
/// let document = parse_frontmatter("---\ntitle: Example\n---\nBody\n").unwrap();
/// assert_eq!(document.frontmatter.unwrap()["title"], "Example");
/// assert_eq!(document.body, "Body\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<Document, serde_yaml_ng::Error> {
    let no_frontmatter = || Document {
        frontmatter: None,
        body: content.to_string(),
    };

    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return Ok(no_frontmatter());
    };

    let Some((yaml, body)) = split_at_closing_delimiter(rest) else {
        return Ok(no_frontmatter());
    };

    if yaml.trim().is_empty() {
        return Ok(Document {
            frontmatter: Some(Frontmatter::new()),
            body: body.to_string(),
        });
    }

    let frontmatter = match serde_yaml_ng::from_str::<Value>(yaml)? {
        Value::Object(mapping) => Some(mapping),
        Value::Null => Some(Frontmatter::new()),
        other => {
            debug!(kind = %kind(&other), "frontmatter is not a mapping, ignoring it");
            None
        }
    };

    Ok(Document {
        frontmatter,
        body: body.to_string(),
    })
}

/// Render frontmatter back in front of `body`
///
/// An empty mapping removes the block entirely.
pub fn render_frontmatter(
    frontmatter: &Frontmatter,
    body: &str,
) -> Result<String, serde_yaml_ng::Error> {
    if frontmatter.is_empty() {
        return Ok(body.to_string());
    }

    let yaml = serde_yaml_ng::to_string(frontmatter)?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

/// Find the closing "---" line; returns the YAML before it and the body after it.
fn split_at_closing_delimiter(rest: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
