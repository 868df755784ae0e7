//! Text positions, ranges and edits.
//!
//! Positions are zero-based. `character` counts Unicode scalar values within
//! the line, not bytes.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering whole lines `[first, last)`.
    #[must_use]
    pub const fn lines(first: u32, last: u32) -> Self {
        Self {
            start: Position::new(first, 0),
            end: Position::new(last, 0),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Replace `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

impl TextEdit {
    #[must_use]
    pub fn new(range: Range, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    #[must_use]
    pub fn replace_lines(first: u32, last: u32, new_text: impl Into<String>) -> Self {
        Self::new(Range::lines(first, last), new_text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit range {line}:{character} lies outside the document")]
    OutOfBounds { line: u32, character: u32 },
    #[error("edit ranges overlap at line {line}")]
    Overlapping { line: u32 },
    #[error("edit range is inverted at line {line}")]
    Inverted { line: u32 },
}

/// Byte offset of every line start, plus one past the end of the text.
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
    starts
}

fn byte_offset(text: &str, starts: &[usize], pos: Position) -> Result<usize, EditError> {
    let out_of_bounds = EditError::OutOfBounds {
        line: pos.line,
        character: pos.character,
    };
    let line = pos.line as usize;

    // The start of the line after the last one addresses the end of text.
    if line == starts.len() && pos.character == 0 {
        return Ok(text.len());
    }
    let Some(&start) = starts.get(line) else {
        return Err(out_of_bounds);
    };
    let end = starts
        .get(line + 1)
        .map_or(text.len(), |next| next.saturating_sub(1));
    let line_text = &text[start..end];

    if pos.character == 0 {
        return Ok(start);
    }
    let chars = pos.character as usize;
    match line_text.char_indices().nth(chars) {
        Some((idx, _)) => Ok(start + idx),
        None if line_text.chars().count() == chars => Ok(end),
        None => Err(out_of_bounds),
    }
}

/// Apply non-overlapping edits to `text`.
///
/// Edits may arrive in any order; they are applied back-to-front against the
/// original coordinates.
pub fn apply_edits(text: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let starts = line_starts(text);
    let mut spans = Vec::with_capacity(edits.len());
    for edit in edits {
        let start = byte_offset(text, &starts, edit.range.start)?;
        let end = byte_offset(text, &starts, edit.range.end)?;
        if end < start {
            return Err(EditError::Inverted {
                line: edit.range.start.line,
            });
        }
        spans.push((start, end, edit));
    }
    spans.sort_by_key(|(start, end, _)| (*start, *end));

    for pair in spans.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(EditError::Overlapping {
                line: pair[1].2.range.start.line,
            });
        }
    }

    let mut out = text.to_string();
    for (start, end, edit) in spans.into_iter().rev() {
        out.replace_range(start..end, &edit.new_text);
    }
    Ok(out)
}
