//! Plain-text export built on the layout
//!
//! Spans are grouped into lines by vertical position and ordered top to
//! bottom, left to right. Pages are separated by a blank line.

use std::cmp::Ordering;

use crate::error::PdfEditError;
use crate::layout::{extract_layout, PageLayout, TextSpan};

/// Fraction of the smaller span height two spans must overlap to share a line.
const LINE_OVERLAP: f64 = 0.5;

/// Horizontal gap, as a fraction of the font size, read as a word break.
const WORD_GAP: f64 = 0.15;

pub fn extract_text(bytes: &[u8]) -> Result<String, PdfEditError> {
    let layout = extract_layout(bytes)?;
    let mut out = String::new();
    for page in &layout.pages {
        out.push_str(&page_text(page));
        out.push_str("\n\n");
    }
    Ok(out)
}

/// Text of one page, one line per output line.
pub fn page_text(page: &PageLayout) -> String {
    group_lines(&page.text_blocks)
        .iter()
        .map(|line| join_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn same_line(a: &TextSpan, b: &TextSpan) -> bool {
    let overlap = (a.y + a.height).min(b.y + b.height) - a.y.max(b.y);
    let smaller = a.height.min(b.height);
    if smaller <= 0.0 {
        return (a.y - b.y).abs() < f64::EPSILON;
    }
    overlap >= smaller * LINE_OVERLAP
}

fn group_lines(spans: &[TextSpan]) -> Vec<Vec<&TextSpan>> {
    let mut sorted: Vec<&TextSpan> = spans.iter().filter(|s| !s.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines: Vec<Vec<&TextSpan>> = Vec::new();
    for span in sorted {
        match lines.last_mut() {
            Some(line) if line.iter().any(|other| same_line(other, span)) => line.push(span),
            _ => lines.push(vec![span]),
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    }
    lines
}

fn join_line(line: &[&TextSpan]) -> String {
    let mut text = String::new();
    let mut prev_end: Option<f64> = None;

    for span in line {
        if let Some(end) = prev_end {
            let gap = span.x - end;
            if gap > span.size * WORD_GAP && !text.ends_with(' ') && !span.text.starts_with(' ') {
                text.push(' ');
            }
        }
        text.push_str(&span.text);
        prev_end = Some(span.x + span.width);
    }
    text.trim_end().to_string()
}
