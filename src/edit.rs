//! Span edits over source text.
//!
//! Rewrites never reprint a tree. They collect `(start, end, text)` replacements against
//! the original text and apply them back to front, so untouched code keeps its exact
//! formatting and comments.

use oxc_span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: u32,
    pub end: u32,
    pub text: String,
}

impl Edit {
    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Edit {
            start: span.start,
            end: span.end,
            text: text.into(),
        }
    }

    pub fn range(start: u32, end: u32, text: impl Into<String>) -> Self {
        Edit {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: u32, text: impl Into<String>) -> Self {
        Self::range(at, at, text)
    }

    pub fn remove(start: u32, end: u32) -> Self {
        Self::range(start, end, "")
    }
}

/// Removal of a whole statement along with its line, when it sits alone on it.
pub fn remove_statement(source: &str, span: Span) -> Edit {
    let (start, end) = (span.start as usize, span.end as usize);
    let line_start = source[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let rest = &source[end..];
    let line_end = rest.find('\n').map(|i| end + i + 1).unwrap_or(source.len());
    let alone = source[line_start..start].trim().is_empty() && source[end..line_end].trim().is_empty();
    if alone {
        Edit::remove(line_start as u32, line_end as u32)
    } else {
        Edit::remove(span.start, span.end)
    }
}

/// Apply edits. Edits starting at the same offset land in the order they were pushed;
/// an edit overlapping one already applied is dropped.
pub fn apply_edits(source: &str, edits: Vec<Edit>) -> String {
    let mut indexed: Vec<(usize, Edit)> = edits.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| b.start.cmp(&a.start).then(ib.cmp(ia)));

    let mut result = source.to_string();
    let mut floor = source.len() as u32;
    for (_, edit) in indexed {
        if edit.end > floor || edit.start > edit.end || edit.end as usize > source.len() {
            tracing::debug!(start = edit.start, end = edit.end, "dropping overlapping edit");
            continue;
        }
        result.replace_range(edit.start as usize..edit.end as usize, &edit.text);
        floor = edit.start;
    }
    result
}
