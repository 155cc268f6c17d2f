//! Line-oriented directive merging.
//!
//! A [`Directive`] is a line or block that must appear exactly once in a text
//! file. Merging walks the existing lines once:
//!
//! - a blank line is kept only when the output does not already end in one
//! - a line recognised by a directive is replaced by the directive's canonical
//!   text the first time, and dropped on every later occurrence
//! - any other line is kept as-is
//!
//! Directives not seen in the file are appended afterwards, each preceded by a
//! single blank separator. Block directives are recognised by their first
//! line and consume existing lines up to and including the line that closes
//! the block (one ending in the canonical closing line, `}` for a function),
//! looking at most `span` lines ahead. A block whose first line already
//! closes it consumes nothing else, and an unclosed block consumes only its
//! first line, so user lines after an old or one-line block are never lost.
//!
//! A leading UTF-8 byte order mark is set aside before matching and written
//! back in front of the merged text.

use crate::error::ShellError;
use sso_sync_config::write_atomic;
use std::fs;
use std::path::Path;

/// A line or block guaranteed to appear exactly once in a file.
pub struct Directive {
    /// Short label used in log output.
    label: &'static str,
    matcher: Box<dyn Fn(&str) -> bool>,
    lines: Vec<String>,
    span: usize,
    /// Trimmed closing line of a block; `None` for single-line directives.
    closer: Option<String>,
}

impl Directive {
    /// Single-line directive.
    pub fn line(
        label: &'static str,
        canonical: impl Into<String>,
        matcher: impl Fn(&str) -> bool + 'static,
    ) -> Self {
        Self {
            label,
            matcher: Box::new(matcher),
            lines: vec![canonical.into()],
            span: 1,
            closer: None,
        }
    }

    /// Multi-line block matched on its start line. The historical span
    /// defaults to the canonical line count.
    pub fn block(
        label: &'static str,
        canonical: &str,
        matcher: impl Fn(&str) -> bool + 'static,
    ) -> Self {
        let lines: Vec<String> = canonical.lines().map(str::to_string).collect();
        let span = lines.len().max(1);
        let closer = lines
            .last()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        Self {
            label,
            matcher: Box::new(matcher),
            lines,
            span,
            closer,
        }
    }

    /// Override how many lines an existing occurrence may occupy at most.
    pub fn with_span(mut self, span: usize) -> Self {
        self.span = span.max(1);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn canonical_lines(&self) -> &[String] {
        &self.lines
    }

    pub fn matches(&self, line: &str) -> bool {
        (self.matcher)(line)
    }

    /// Number of lines after `lines[start]` that belong to the existing
    /// occurrence starting there.
    fn trailing_len<S: AsRef<str>>(&self, lines: &[S], start: usize) -> usize {
        let Some(closer) = self.closer.as_deref() else {
            return 0;
        };
        if self.span <= 1 {
            return 0;
        }
        let closes = |line: &str| line.trim_end().ends_with(closer);
        if closes(lines[start].as_ref()) {
            return 0;
        }
        let last = (start + self.span - 1).min(lines.len().saturating_sub(1));
        match (start + 1..=last).find(|&k| closes(lines[k].as_ref())) {
            Some(end) => end - start,
            None => {
                log::warn!(
                    "'{}' block has no closing line within {} lines; replacing its first line only",
                    self.label,
                    self.span
                );
                0
            }
        }
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directive")
            .field("label", &self.label)
            .field("lines", &self.lines)
            .field("span", &self.span)
            .field("closer", &self.closer)
            .finish()
    }
}

/// UTF-8 byte order mark some editors put at the start of a profile.
const BOM: &str = "\u{feff}";

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn ends_in_blank(output: &[String]) -> bool {
    output.last().is_some_and(|l| is_blank(l))
}

/// Merge `directives` into `lines`.
pub fn merge_directives<S: AsRef<str>>(lines: &[S], directives: &[Directive]) -> Vec<String> {
    let mut output: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut emitted = vec![false; directives.len()];
    let mut index = 0;

    while index < lines.len() {
        let line = lines[index].as_ref();
        index += 1;

        if is_blank(line) {
            if !ends_in_blank(&output) {
                output.push(line.to_string());
            }
            continue;
        }

        match directives.iter().position(|d| d.matches(line)) {
            Some(i) => {
                if emitted[i] {
                    log::debug!("Dropping duplicate '{}' directive", directives[i].label);
                } else {
                    output.extend(directives[i].lines.iter().cloned());
                    emitted[i] = true;
                }
                index += directives[i].trailing_len(lines, index - 1);
            }
            None => output.push(line.to_string()),
        }
    }

    for (directive, done) in directives.iter().zip(&emitted) {
        if *done {
            continue;
        }
        if !output.is_empty() && !ends_in_blank(&output) {
            output.push(String::new());
        }
        log::debug!("Appending '{}' directive", directive.label);
        output.extend(directive.lines.iter().cloned());
    }

    output
}

/// Merge `directives` into file text, keeping its line ending style.
///
/// Non-empty output always ends with a line ending, and a leading byte
/// order mark is kept.
pub fn merge_text(text: &str, directives: &[Directive]) -> String {
    let (bom, body) = match text.strip_prefix(BOM) {
        Some(rest) => (BOM, rest),
        None => ("", text),
    };
    let newline = if body.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = body.lines().collect();
    let merged = merge_directives(&lines, directives);
    if merged.is_empty() {
        return bom.to_string();
    }
    let mut out = String::from(bom);
    out.push_str(&merged.join(newline));
    out.push_str(newline);
    out
}

/// What a file merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The file did not exist and was written.
    Created,
    /// The file existed and its content changed.
    Updated,
    /// The file already held the merged content; nothing was written.
    Unchanged,
}

/// Read `path`, merge `directives`, and atomically write the result back.
///
/// A missing file is treated as empty and its parent directory is created.
/// Content that is not text (invalid UTF-8 or NUL bytes) fails with
/// [`ShellError::Unmergeable`] before anything is written.
pub fn merge_file(path: &Path, directives: &[Directive]) -> Result<MergeOutcome, ShellError> {
    let existing = match fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(source) => {
            return Err(ShellError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let current = match &existing {
        Some(bytes) => {
            if bytes.contains(&0) {
                return Err(ShellError::Unmergeable {
                    path: path.to_path_buf(),
                });
            }
            std::str::from_utf8(bytes).map_err(|_| ShellError::Unmergeable {
                path: path.to_path_buf(),
            })?
        }
        None => "",
    };

    let merged = merge_text(current, directives);
    if existing.is_some() && merged == current {
        return Ok(MergeOutcome::Unchanged);
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| ShellError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    write_atomic(path, merged.as_bytes()).map_err(|source| ShellError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(if existing.is_some() {
        MergeOutcome::Updated
    } else {
        MergeOutcome::Created
    })
}
