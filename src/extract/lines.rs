//! Grouping of text spans into lines.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use super::content::{is_spaceless_script_char, TextSpan};
use crate::model::{Rect, TextPrimitive};

/// Spans further apart than this many font sizes start a new line segment.
const SEGMENT_GAP: f32 = 2.5;

/// A text line composed of spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Baseline (PDF space)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
    /// Dominant font size in this line
    pub font_size: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        if spans.is_empty() {
            return Self {
                spans,
                y: 0.0,
                x: 0.0,
                font_size: 0.0,
            };
        }

        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        // Weighted by text length
        let total_chars: usize = spans.iter().map(|s| s.text.chars().count()).sum();
        let weighted: f32 = spans
            .iter()
            .map(|s| s.font_size * s.text.chars().count() as f32)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f32
        } else {
            spans[0].font_size
        };

        let y = spans[0].y;
        let x = spans[0].x;
        Self {
            spans,
            y,
            x,
            font_size,
        }
    }

    /// Right edge of the last span.
    pub fn right(&self) -> f32 {
        self.spans
            .iter()
            .map(TextSpan::right)
            .fold(self.x, f32::max)
    }

    /// Combined text, with spaces inserted at visible gaps.
    ///
    /// Adjacent characters of spaceless scripts are never separated.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();

                let chars = span.text.chars().count();
                let avg_char_width = if chars > 0 && span.width > 0.0 {
                    span.width / chars as f32
                } else {
                    span.font_size * 0.5
                };

                let both_spaceless = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                    || span.text.starts_with([' ', '\u{00A0}']);

                if gap > avg_char_width * 0.2 && !both_spaceless && !has_space {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }

    /// Split where the horizontal gap between spans is too wide to be a word space.
    pub fn split_at_gaps(self) -> Vec<TextLine> {
        let mut segments = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();

        for span in self.spans {
            if let Some(prev) = current.last() {
                if span.x - prev.right() > span.font_size.max(prev.font_size) * SEGMENT_GAP {
                    segments.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
            }
            current.push(span);
        }
        if !current.is_empty() {
            segments.push(TextLine::from_spans(current));
        }
        segments
    }

    /// Convert to a text primitive with a top-left-origin box.
    pub fn to_primitive(&self, page: u32, page_height: f32) -> Option<TextPrimitive> {
        // Decomposed accents from some encoders are composed back (NFC).
        let text: String = self.text().trim().nfc().collect();
        if text.is_empty() || self.font_size <= 0.0 {
            return None;
        }

        let top = page_height - (self.y + self.font_size * 0.8);
        let width = (self.right() - self.x).max(self.font_size * 0.5);
        let rect = Rect::new(self.x, top, width, self.font_size);
        Some(TextPrimitive::new(page, rect, text))
    }
}

/// Group spans into lines by baseline, top of page first.
///
/// Spans whose baselines are within 30% of the font size share a line.
pub fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
        other => other,
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}
