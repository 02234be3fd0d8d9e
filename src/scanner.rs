// obcsim-compiler/src/scanner.rs
// Turns raw script text into comment-free, continuation-merged logical lines.

use crate::error::CompileError;
use std::fs;
use std::path::Path;

/// One logical line of the script. `number` is the 1-based physical line
/// number of the first physical line that contributed to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

/// Read and scan a script file. I/O failures surface as `CompileError::Io`.
pub fn scan_file(path: &Path) -> Result<Vec<Line>, CompileError> {
    let source = fs::read_to_string(path)?;
    scan(&source)
}

/// Scan source text into logical lines.
///
/// Per physical line: a `#` outside a quoted string truncates the line there;
/// a string still open at the end of the physical line is a fatal scan error.
/// After truncation and trimming, a trailing `\` merges the next line's
/// content onto this one with a single separating space, keeping the first
/// line's number. Lines that end up empty are dropped.
pub fn scan(source: &str) -> Result<Vec<Line>, CompileError> {
    let mut lines = Vec::new();
    // Logical line under construction while trailing continuations persist.
    let mut pending: Option<Line> = None;

    for (index, physical) in source.lines().enumerate() {
        let number = index + 1;
        let content = strip_comment(physical)
            .ok_or_else(|| CompileError::scan(number, "string missing a closing quotation"))?;
        let mut content = content.trim().to_string();

        if let Some(prev) = pending.take() {
            content = format!("{} {}", prev.text, content);
            content = content.trim().to_string();
            pending = Some(Line {
                number: prev.number,
                text: content.clone(),
            });
        }

        if let Some(marker_stripped) = content.strip_suffix('\\') {
            let text = marker_stripped.trim().to_string();
            let number = pending.as_ref().map_or(number, |p| p.number);
            pending = Some(Line { number, text });
            continue;
        }

        let line = match pending.take() {
            Some(merged) => merged,
            None => Line {
                number,
                text: content,
            },
        };
        if !line.text.is_empty() {
            lines.push(line);
        }
    }

    // A trailing continuation at end of input simply ends the logical line.
    if let Some(line) = pending {
        if !line.text.is_empty() {
            lines.push(line);
        }
    }

    Ok(lines)
}

/// Truncate `line` at the first `#` that is not inside a quoted string.
/// Returns `None` if a string is still open at the end of the line.
fn strip_comment(line: &str) -> Option<&str> {
    let mut in_string = false;
    for (i, ch) in line.char_indices() {
        if in_string {
            if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if ch == '#' {
            return Some(&line[..i]);
        }
    }
    if in_string {
        None
    } else {
        Some(line)
    }
}
