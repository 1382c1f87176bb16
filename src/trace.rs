//! Build-time trace annotations.
//!
//! A build step stamps every authored element with a source attribute of the
//! form `path:line:column:tag`. Line is 1-based; column is the 0-based
//! authoring column plus one; `tag` is the authored element name. The path is
//! POSIX-relative to the project root when one is configured.

use thiserror::Error;

/// Attribute name carrying the trace annotation.
pub const TRACE_SOURCE: &str = "data-inspect-source";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceParseError {
    #[error("trace annotation has {found} fields, expected at least 3")]
    TooFewFields { found: usize },
    #[error("invalid {field} in trace annotation: {value:?}")]
    InvalidNumber {
        field: &'static str,
        value: String,
    },
    #[error("trace annotation has an empty file name")]
    EmptyFileName,
}

/// One parsed trace annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub file_name: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
    pub tag: Option<String>,
}

impl Trace {
    /// Build a trace from an authoring location: 1-based line, 0-based
    /// column, and an optional project root to relativize against.
    pub fn from_location(
        file_name: &str,
        project_cwd: Option<&str>,
        line: u32,
        column_zero_based: u32,
        tag: &str,
    ) -> Self {
        let file_name = match project_cwd {
            Some(cwd) => posix_relative(cwd, file_name),
            None => file_name.to_owned(),
        };
        Self {
            file_name,
            line,
            column: column_zero_based + 1,
            tag: Some(tag.to_owned()),
        }
    }

    /// The attribute value: `path:line:column:tag`.
    pub fn format(&self) -> String {
        let tag = self.tag.as_deref().unwrap_or("");
        format!("{}:{}:{}:{}", self.file_name, self.line, self.column, tag)
    }

    /// Parse an attribute value. The three trailing fields are taken from
    /// the right so a file name containing `:` still parses.
    pub fn parse(value: &str) -> Result<Self, TraceParseError> {
        let fields: Vec<&str> = value.split(':').collect();
        if fields.len() < 3 {
            return Err(TraceParseError::TooFewFields {
                found: fields.len(),
            });
        }
        let (tag, numeric_end) = if fields.len() >= 4 {
            (Some(fields[fields.len() - 1].to_owned()), fields.len() - 1)
        } else {
            (None, fields.len())
        };
        let column = parse_number("column", fields[numeric_end - 1])?;
        let line = parse_number("line", fields[numeric_end - 2])?;
        let file_name = fields[..numeric_end - 2].join(":");
        if file_name.is_empty() {
            return Err(TraceParseError::EmptyFileName);
        }
        Ok(Self {
            file_name,
            line,
            column,
            tag: tag.filter(|t| !t.is_empty()),
        })
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<u32, TraceParseError> {
    value
        .parse()
        .map_err(|_| TraceParseError::InvalidNumber {
            field,
            value: value.to_owned(),
        })
}

/// POSIX-style relative path from `base` to `path`, both `/`-separated.
pub fn posix_relative(base: &str, path: &str) -> String {
    let base_parts: Vec<&str> = base.split('/').filter(|part| !part.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|part| !part.is_empty()).collect();

    let shared = base_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in shared..base_parts.len() {
        parts.push("..");
    }
    parts.extend(&path_parts[shared..]);
    parts.join("/")
}
