//! Minimal order-preserving INI document, as used by the AWS CLI config file.
//!
//! Supported syntax:
//! - `[section name]` headers
//! - `key = value` and `key: value` entries (split on the first `=`, else `:`)
//! - `#` / `;` comment lines, kept verbatim
//! - indented continuation lines under an entry (the AWS CLI nested form
//!   `s3 =\n    max_concurrent_requests = 10`), kept verbatim
//!
//! Blank lines are not stored; rendering separates sections with exactly one
//! blank line, so `parse(render(doc)) == doc` and rendering is byte-stable.

use crate::error::ConfigError;
use std::fmt;

/// One stored line of a section body.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Entry { key: String, value: String },
    Comment(String),
    Continuation(String),
}

/// A named section and its body lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    lines: Vec<Line>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key/value entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Value of the last entry named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
            .last()
    }

    fn set_entries<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.lines = entries
            .into_iter()
            .map(|(key, value)| Line::Entry {
                key: key.into(),
                value: value.into(),
            })
            .collect();
    }
}

/// Ordered INI document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    /// Comment lines before the first section header.
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl IniDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Repeated headers for the same section continue the
    /// earlier section instead of creating a duplicate.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut doc = IniDocument::new();
        let mut current: Option<usize> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                continue;
            }

            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                match current {
                    Some(i) => doc.sections[i]
                        .lines
                        .push(Line::Comment(raw.trim_end().to_string())),
                    None => doc.preamble.push(raw.trim_end().to_string()),
                }
                continue;
            }

            let indented = raw.starts_with(' ') || raw.starts_with('\t');
            if indented
                && let Some(i) = current
                && doc.sections[i]
                    .lines
                    .iter()
                    .any(|l| matches!(l, Line::Entry { .. }))
            {
                doc.sections[i]
                    .lines
                    .push(Line::Continuation(raw.trim_end().to_string()));
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(ConfigError::IniSyntax {
                        line: line_no,
                        message: format!("unterminated section header '{trimmed}'"),
                    });
                };
                let name = name.trim();
                current = Some(match doc.position(name) {
                    Some(i) => i,
                    None => {
                        doc.sections.push(Section::new(name));
                        doc.sections.len() - 1
                    }
                });
                continue;
            }

            let Some(i) = current else {
                return Err(ConfigError::IniSyntax {
                    line: line_no,
                    message: "entry appears before any section header".to_string(),
                });
            };

            let split_at = trimmed.find('=').or_else(|| trimmed.find(':'));
            let Some(pos) = split_at else {
                return Err(ConfigError::IniSyntax {
                    line: line_no,
                    message: format!("expected 'key = value', found '{trimmed}'"),
                });
            };
            let key = trimmed[..pos].trim();
            if key.is_empty() {
                return Err(ConfigError::IniSyntax {
                    line: line_no,
                    message: "entry has an empty key".to_string(),
                });
            }
            doc.sections[i].lines.push(Line::Entry {
                key: key.to_string(),
                value: trimmed[pos + 1..].trim().to_string(),
            });
        }

        Ok(doc)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.name == name)
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Replace the whole body of `name` with `entries`, keeping the section's
    /// position. Comments and continuation lines inside it are dropped.
    /// A missing section is appended.
    pub fn replace_section<K, V>(&mut self, name: &str, entries: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let idx = match self.position(name) {
            Some(i) => i,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };
        self.sections[idx].set_entries(entries);
    }

    /// Append `name` with `entries` unless it already exists.
    /// Returns `true` when the section was added.
    pub fn insert_section_if_missing<K, V>(
        &mut self,
        name: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> bool
    where
        K: Into<String>,
        V: Into<String>,
    {
        if self.has_section(name) {
            return false;
        }
        self.replace_section(name, entries);
        true
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.preamble {
            writeln!(f, "{line}")?;
        }
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 || !self.preamble.is_empty() {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for line in &section.lines {
                match line {
                    Line::Entry { key, value } if value.is_empty() => writeln!(f, "{key} =")?,
                    Line::Entry { key, value } => writeln!(f, "{key} = {value}")?,
                    Line::Comment(text) | Line::Continuation(text) => writeln!(f, "{text}")?,
                }
            }
        }
        Ok(())
    }
}
