//! Rendering and idempotent splicing of the `## Screenshots` section.
//!
//! The merge recognises exactly one section per document: the first line
//! matching the heading pattern, extending to just before the next `## `
//! heading or the end of the document. Everything outside that region is
//! preserved byte-for-byte.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// One labelled screenshot destined for the PR description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotEntry {
    pub label: String,
    pub url: String,
}

impl ScreenshotEntry {
    pub fn new(label: &str, url: &str) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
        }
    }
}

pub const SECTION_HEADING: &str = "## Screenshots";

/// Start of the section: a `## Screenshots` heading line, case-insensitive,
/// leading whitespace allowed.
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*##[ \t]+screenshots\b").expect("heading pattern compiles")
});

/// End boundary: the next same-depth heading line.
static NEXT_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^##\s").expect("boundary pattern compiles"));

/// Render the canonical section markdown. Order-preserving; duplicate labels
/// are permitted. Ends with exactly one trailing newline.
pub fn render_section(entries: &[ScreenshotEntry]) -> String {
    let mut lines = vec![SECTION_HEADING.to_string(), String::new()];
    for entry in entries {
        lines.push(format!("### {}", entry.label));
        lines.push(format!("![{}]({})", entry.label, entry.url));
        lines.push(String::new());
    }
    format!("{}\n", lines.join("\n").trim_end())
}

/// Byte range of the existing Screenshots section in `body`: from its heading
/// to just before the newline preceding the next `## ` heading, or to the end
/// of the document. First match wins; later duplicates are left alone.
fn locate_section(body: &str) -> Option<Range<usize>> {
    let heading = HEADING.find(body)?;
    let line_end = body[heading.end()..]
        .find('\n')
        .map(|i| heading.end() + i)
        .unwrap_or(body.len());
    let end = NEXT_HEADING
        .find(&body[line_end..])
        // The region stops before the newline that introduces the next heading.
        .map(|next| line_end + next.start() - 1)
        .unwrap_or(body.len());
    Some(heading.start()..end)
}

/// Insert or replace the Screenshots section in `document`.
///
/// If a section exists, exactly its subrange is replaced; all surrounding
/// text is untouched. Otherwise the rendered section is appended after one
/// blank line (none when the document is empty). The result always ends with
/// exactly one newline, which makes the operation idempotent:
/// `merge(merge(d, e), e) == merge(d, e)`.
pub fn merge(document: &str, entries: &[ScreenshotEntry]) -> String {
    let body = document.trim_end_matches('\n');
    let section = render_section(entries);

    let merged = match locate_section(body) {
        Some(range) => format!(
            "{}{}{}",
            &body[..range.start],
            section.trim_end_matches('\n'),
            &body[range.end..]
        ),
        None if body.is_empty() => return section,
        None => format!("{body}\n\n{section}"),
    };

    if merged.ends_with('\n') {
        merged
    } else {
        format!("{merged}\n")
    }
}
