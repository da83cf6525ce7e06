//! Suppression of free text that was also detected as part of a table.
//!
//! Text line detection and table detection run independently, so the glyphs
//! inside a table are usually reported twice. A text line is dropped only
//! when it lies completely inside a table box on the same page; partial
//! overlaps are kept.

use std::collections::HashMap;

use crate::model::{Rect, TablePrimitive, TextPrimitive};

/// When a text line counts as belonging to a table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum OverlapPolicy {
    /// All four edges within or on the table box
    #[default]
    Containment,
    /// At least this fraction (0.0-1.0) of the line's area lies inside the table box
    MinCoverage(f32),
}

impl OverlapPolicy {
    fn covers(&self, table: &Rect, line: &Rect) -> bool {
        match *self {
            OverlapPolicy::Containment => table.contains(line),
            OverlapPolicy::MinCoverage(ratio) => {
                let area = line.area();
                let overlap = table.intersection_area(line);
                area > 0.0 && overlap > 0.0 && overlap / area >= ratio
            }
        }
    }
}

/// Removes text primitives that duplicate table content.
#[derive(Debug, Clone, Default)]
pub struct OverlapResolver {
    policy: OverlapPolicy,
}

impl OverlapResolver {
    /// Create a resolver using boundary-inclusive containment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolver with a custom policy.
    pub fn with_policy(policy: OverlapPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Drop every block covered by a table on its page.
    ///
    /// Returns the number of removed blocks. Blocks or tables with unusable
    /// boxes never match.
    pub fn resolve(&self, blocks: &mut Vec<TextPrimitive>, tables: &[TablePrimitive]) -> usize {
        let mut table_boxes: HashMap<u32, Vec<Rect>> = HashMap::new();
        for table in tables {
            match table.rect() {
                Ok(rect) => table_boxes.entry(table.page).or_default().push(rect),
                Err(e) => log::debug!("table on page {} ignored for overlap: {}", table.page, e),
            }
        }

        if table_boxes.is_empty() {
            return 0;
        }

        let before = blocks.len();
        blocks.retain(|block| {
            let Some(boxes) = table_boxes.get(&block.page) else {
                return true;
            };
            let Ok(rect) = block.rect() else {
                return true;
            };
            let covered = boxes.iter().any(|table| self.policy.covers(table, &rect));
            if covered {
                log::debug!(
                    "dropping text inside table on page {}: {:?}",
                    block.page,
                    block.text
                );
            }
            !covered
        });

        let removed = before - blocks.len();
        if removed > 0 {
            log::info!("removed {} text blocks duplicated by tables", removed);
        }
        removed
    }
}

/// Drop blocks contained in a table box, using the default policy.
pub fn remove_table_text(blocks: &mut Vec<TextPrimitive>, tables: &[TablePrimitive]) -> usize {
    OverlapResolver::new().resolve(blocks, tables)
}
