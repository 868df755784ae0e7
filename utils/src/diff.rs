//! Line diffs: minimal text edits and unified rendering.

use std::fmt::Write as _;

use ferrule_types::TextEdit;
use similar::{ChangeTag, DiffOp, TextDiff};

/// Line-granular edits that turn `old` into `new`.
///
/// Ranges address `old`; applying the result with
/// [`ferrule_types::apply_edits`] reproduces `new` exactly.
#[must_use]
pub fn text_edits(old: &str, new: &str) -> Vec<TextEdit> {
    let diff = TextDiff::from_lines(old, new);
    let new_lines = diff.new_slices();
    let joined = |start: usize, len: usize| new_lines[start..start + len].concat();

    let mut edits = Vec::new();
    for op in diff.ops() {
        match *op {
            DiffOp::Equal { .. } => {}
            DiffOp::Delete {
                old_index, old_len, ..
            } => edits.push(TextEdit::replace_lines(
                old_index as u32,
                (old_index + old_len) as u32,
                "",
            )),
            DiffOp::Insert {
                old_index,
                new_index,
                new_len,
            } => edits.push(TextEdit::replace_lines(
                old_index as u32,
                old_index as u32,
                joined(new_index, new_len),
            )),
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => edits.push(TextEdit::replace_lines(
                old_index as u32,
                (old_index + old_len) as u32,
                joined(new_index, new_len),
            )),
        }
    }
    edits
}

/// Format a unified diff between old and new file content.
///
/// Produces output with:
/// - 1 line of context around each change
/// - `...` between changes separated by >3 unchanged lines
/// - `-` for deletions, `+` for additions, old/new line numbers in the gutter
#[must_use]
pub fn format_unified_diff(old_text: &str, new_text: &str) -> String {
    let diff = TextDiff::from_lines(old_text, new_text);
    let changes: Vec<_> = diff.iter_all_changes().collect();
    if changes.iter().all(|c| c.tag() == ChangeTag::Equal) {
        return String::new();
    }

    let max_line = old_text.lines().count().max(new_text.lines().count()).max(1);
    let width = max_line.to_string().len();
    let gap_marker = format!("{:>width$}\n", "...");

    let mut out = String::new();
    let mut last_output_idx: Option<usize> = None;

    for (i, change) in changes.iter().enumerate() {
        let (line_no, marker) = match change.tag() {
            ChangeTag::Equal => {
                let near_prev = i > 0 && changes[i - 1].tag() != ChangeTag::Equal;
                let near_next = changes
                    .get(i + 1)
                    .is_some_and(|c| c.tag() != ChangeTag::Equal);
                if !(near_prev || near_next) {
                    continue;
                }
                (change.old_index(), ' ')
            }
            ChangeTag::Delete => (change.old_index(), '-'),
            ChangeTag::Insert => (change.new_index(), '+'),
        };

        if let Some(last_idx) = last_output_idx
            && i - last_idx - 1 > 3
        {
            out.push_str(&gap_marker);
        }
        let line_no = line_no.map_or(0, |idx| idx + 1);
        let _ = write!(out, "{line_no:>width$} {marker}");
        out.push_str(change.value().trim_end_matches('\n'));
        out.push('\n');
        last_output_idx = Some(i);
    }

    out
}

/// Compute diff stats (additions and deletions) between old and new content.
#[must_use]
pub fn compute_diff_stats(old_text: &str, new_text: &str) -> (u32, u32) {
    let diff = TextDiff::from_lines(old_text, new_text);

    let mut additions: u32 = 0;
    let mut deletions: u32 = 0;

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => additions += 1,
            ChangeTag::Delete => deletions += 1,
            ChangeTag::Equal => {}
        }
    }

    (additions, deletions)
}
