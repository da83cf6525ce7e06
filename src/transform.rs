//! Content substitution between extraction and rendering.
//!
//! A [`ContentTransform`] rewrites text (typically a translation). Only text
//! is replaced: boxes, page indices and table shapes are never touched, so
//! the layout computed from the source document stays valid.

use crate::error::{Error, Result};
use crate::model::{CellValue, TablePrimitive, TextPrimitive};

/// A text rewriting backend.
pub trait ContentTransform {
    /// Rewrite one piece of text, preserving its line count and order.
    fn transform_text(&self, text: &str, target: &str) -> Result<String>;

    /// Rewrite every text cell of a table, keeping its shape.
    ///
    /// Empty and non-text cells are passed through untouched.
    fn transform_rows(&self, rows: &[Vec<CellValue>], target: &str) -> Result<Vec<Vec<CellValue>>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.as_text() {
                        Some(text) => Ok(CellValue::Text(self.transform_text(text, target)?)),
                        None => Ok(cell.clone()),
                    })
                    .collect()
            })
            .collect()
    }
}

/// Returns text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ContentTransform for IdentityTransform {
    fn transform_text(&self, text: &str, _target: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Adapts a closure into a [`ContentTransform`].
pub struct FnTransform<F>(pub F);

impl<F> ContentTransform for FnTransform<F>
where
    F: Fn(&str, &str) -> Result<String>,
{
    fn transform_text(&self, text: &str, target: &str) -> Result<String> {
        (self.0)(text, target)
    }
}

impl<T: ContentTransform + ?Sized> ContentTransform for Box<T> {
    fn transform_text(&self, text: &str, target: &str) -> Result<String> {
        (**self).transform_text(text, target)
    }

    fn transform_rows(&self, rows: &[Vec<CellValue>], target: &str) -> Result<Vec<Vec<CellValue>>> {
        (**self).transform_rows(rows, target)
    }
}

impl<T: ContentTransform + ?Sized> ContentTransform for &T {
    fn transform_text(&self, text: &str, target: &str) -> Result<String> {
        (**self).transform_text(text, target)
    }

    fn transform_rows(&self, rows: &[Vec<CellValue>], target: &str) -> Result<Vec<Vec<CellValue>>> {
        (**self).transform_rows(rows, target)
    }
}

/// Counters for one substitution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionStats {
    /// Blocks or tables whose content was replaced
    pub replaced: usize,
    /// Blocks or tables that kept their source content after a failure
    pub failed: usize,
    /// Replacements whose line count differs from the source
    pub line_mismatches: usize,
}

/// Replace the text of every block.
///
/// Empty blocks are not sent to the backend. A failure keeps the source text.
pub fn substitute_blocks<T: ContentTransform + ?Sized>(
    transform: &T,
    blocks: &mut [TextPrimitive],
    target: &str,
) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();

    for block in blocks.iter_mut() {
        if block.text.trim().is_empty() {
            continue;
        }
        match transform.transform_text(&block.text, target) {
            Ok(text) => {
                let expected = block.line_count();
                let actual = text.split('\n').count();
                if actual != expected {
                    log::warn!(
                        "page {}: transformed text has {} lines, source has {}",
                        block.page,
                        actual,
                        expected
                    );
                    stats.line_mismatches += 1;
                }
                block.replace_text(text);
                stats.replaced += 1;
            }
            Err(e) => {
                log::warn!("page {}: keeping source text: {}", block.page, e);
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Replace the cell text of every table.
///
/// A table whose transform fails, or comes back with a different shape,
/// keeps its source rows.
pub fn substitute_tables<T: ContentTransform + ?Sized>(
    transform: &T,
    tables: &mut [TablePrimitive],
    target: &str,
) -> SubstitutionStats {
    let mut stats = SubstitutionStats::default();

    for table in tables.iter_mut() {
        if table.is_empty() {
            continue;
        }
        let rows = transform
            .transform_rows(&table.rows, target)
            .and_then(|rows| check_shape(&table.rows, rows));
        match rows {
            Ok(rows) => {
                table.rows = rows;
                stats.replaced += 1;
            }
            Err(e) => {
                log::warn!("page {}: keeping source table: {}", table.page, e);
                stats.failed += 1;
            }
        }
    }

    stats
}

fn check_shape(source: &[Vec<CellValue>], rows: Vec<Vec<CellValue>>) -> Result<Vec<Vec<CellValue>>> {
    let same = source.len() == rows.len()
        && source.iter().zip(&rows).all(|(a, b)| a.len() == b.len());
    if same {
        Ok(rows)
    } else {
        Err(Error::Transform("table shape changed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use std::cell::Cell;

    fn upper() -> FnTransform<impl Fn(&str, &str) -> Result<String>> {
        FnTransform(|text: &str, _: &str| Ok(text.to_uppercase()))
    }

    #[test]
    fn test_boxes_untouched() {
        let rect = Rect::new(72.0, 100.0, 200.0, 24.0);
        let mut blocks = vec![TextPrimitive::new(2, rect, "hello\nworld")];
        let before = blocks[0].bbox.clone();

        let stats = substitute_blocks(&upper(), &mut blocks, "hi");
        assert_eq!(stats.replaced, 1);
        assert_eq!(blocks[0].text, "HELLO\nWORLD");
        assert_eq!(blocks[0].bbox, before);
        assert_eq!(blocks[0].page, 2);
    }

    #[test]
    fn test_empty_blocks_skip_backend() {
        let calls = Cell::new(0);
        let counting = FnTransform(|text: &str, _: &str| -> Result<String> {
            calls.set(calls.get() + 1);
            Ok(text.to_string())
        });
        let mut blocks = vec![
            TextPrimitive::new(1, Rect::new(0.0, 0.0, 1.0, 1.0), ""),
            TextPrimitive::new(1, Rect::new(0.0, 0.0, 1.0, 1.0), "  "),
            TextPrimitive::new(1, Rect::new(0.0, 0.0, 1.0, 1.0), "x"),
        ];
        substitute_blocks(&counting, &mut blocks, "hi");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failure_keeps_source() {
        let failing = FnTransform(|_: &str, _: &str| -> Result<String> {
            Err(Error::Transform("offline".into()))
        });
        let mut blocks = vec![TextPrimitive::new(1, Rect::new(0.0, 0.0, 1.0, 1.0), "source")];
        let stats = substitute_blocks(&failing, &mut blocks, "hi");
        assert_eq!(stats.failed, 1);
        assert_eq!(blocks[0].text, "source");
    }

    #[test]
    fn test_line_mismatch_counted() {
        let joining = FnTransform(|text: &str, _: &str| -> Result<String> {
            Ok(text.replace('\n', " "))
        });
        let mut blocks = vec![TextPrimitive::new(1, Rect::new(0.0, 0.0, 1.0, 1.0), "a\nb")];
        let stats = substitute_blocks(&joining, &mut blocks, "hi");
        assert_eq!(stats.line_mismatches, 1);
        assert_eq!(blocks[0].text, "a b");
    }

    #[test]
    fn test_rows_keep_shape_and_non_text() {
        let mut tables = vec![TablePrimitive::new(
            1,
            Rect::from_corners(0.0, 0.0, 10.0, 10.0),
            vec![
                vec!["name".into(), CellValue::Empty],
                vec![CellValue::Number(4.0), CellValue::text("")],
            ],
        )];
        let stats = substitute_tables(&upper(), &mut tables, "hi");
        assert_eq!(stats.replaced, 1);
        assert_eq!(
            tables[0].rows,
            vec![
                vec![CellValue::text("NAME"), CellValue::Empty],
                vec![CellValue::Number(4.0), CellValue::text("")],
            ]
        );
    }

    #[test]
    fn test_identity() {
        assert_eq!(IdentityTransform.transform_text("x\ny", "hi").unwrap(), "x\ny");
    }
}
