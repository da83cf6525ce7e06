//! Table detection from text positions (stream mode).
//!
//! Tables are found by looking for rows whose spans start at the same x
//! positions, without relying on ruling lines. Detection does not consume
//! spans: the text inside a table is still reported as free text and later
//! suppressed by the overlap resolver.

use std::collections::{HashMap, HashSet};

use super::content::TextSpan;
use crate::model::{CellGeometry, CellValue, Rect, TablePrimitive};

/// Width of the buckets left edges are snapped to.
const BUCKET: f32 = 5.0;
/// How far a span may start from a column edge and still count as aligned.
const ALIGN_TOLERANCE: f32 = 5.0;

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Baseline of the first row (PDF space)
    pub top_y: f32,
    /// Baseline of the last row
    pub bottom_y: f32,
    /// Left boundary
    pub left_x: f32,
    /// Right boundary
    pub right_x: f32,
    /// Column start positions
    pub columns: Vec<f32>,
    /// Rows of spans
    pub rows: Vec<TableRowData>,
}

/// A row of spans in a table.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Average baseline
    pub y: f32,
    /// Spans sorted by x
    pub spans: Vec<TextSpan>,
}

impl TableRowData {
    fn max_font_size(&self) -> f32 {
        self.spans.iter().map(|s| s.font_size).fold(0.0, f32::max)
    }
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Detects tables in a list of text spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables in the given spans.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        if spans.len() < self.config.min_rows * self.config.min_columns {
            return Vec::new();
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            return Vec::new();
        }

        let columns = self.detect_columns(&rows);
        log::debug!(
            "table detector: {} rows, columns at {:?}",
            rows.len(),
            columns
        );

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let table_rows = rows[start..=end].to_vec();

            // Columns are re-detected for the region alone
            let table_columns = self.detect_columns(&table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "table detector: skipping region with {} columns",
                    table_columns.len()
                );
                continue;
            }
            if self.is_list_pattern(&table_rows, &table_columns) {
                log::debug!("table detector: skipping list-like region");
                continue;
            }

            let all_spans = || table_rows.iter().flat_map(|r| r.spans.iter());
            let left_x = all_spans().map(|s| s.x).fold(f32::INFINITY, f32::min);
            let right_x = all_spans().map(TextSpan::right).fold(f32::NEG_INFINITY, f32::max);

            tables.push(DetectedTable {
                top_y: table_rows[0].y,
                bottom_y: table_rows[table_rows.len() - 1].y,
                left_x,
                right_x,
                columns: table_columns,
                rows: table_rows,
            });
        }

        tables
    }

    /// Group spans into rows by baseline, top first.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        let flush = |current: &mut Vec<TextSpan>, rows: &mut Vec<TableRowData>| {
            if current.is_empty() {
                return;
            }
            let y = current.iter().map(|s| s.y).sum::<f32>() / current.len() as f32;
            let mut spans = std::mem::take(current);
            spans.sort_by(|a, b| a.x.total_cmp(&b.x));
            rows.push(TableRowData { y, spans });
        };

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    flush(&mut current, &mut rows);
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        flush(&mut current, &mut rows);

        rows
    }

    /// Column starts: left edges shared by enough rows.
    ///
    /// Rows with several spans are preferred; when there are too few of
    /// those, every row votes once per span.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        let voters = if multi.len() >= self.config.min_rows {
            for row in &multi {
                let buckets: HashSet<i32> = row
                    .spans
                    .iter()
                    .map(|s| (s.x / BUCKET).round() as i32)
                    .collect();
                for bucket in buckets {
                    *edge_counts.entry(bucket).or_insert(0) += 1;
                }
            }
            multi.len()
        } else {
            for span in rows.iter().flat_map(|r| r.spans.iter()) {
                *edge_counts.entry((span.x / BUCKET).round() as i32).or_insert(0) += 1;
            }
            rows.len()
        };

        let min_occurrences =
            ((voters as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * BUCKET)
            .collect();
        edges.sort_by(f32::total_cmp);

        let mut merged: Vec<f32> = Vec::new();
        for edge in edges {
            match merged.last() {
                Some(last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous runs of well-aligned rows.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        if columns.len() < self.config.min_columns {
            return Vec::new();
        }

        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = self.alignment_score(row, columns) >= self.config.min_alignment_ratio;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    fn alignment_score(&self, row: &TableRowData, columns: &[f32]) -> f32 {
        if row.spans.is_empty() || columns.is_empty() {
            return 0.0;
        }
        let aligned = row
            .spans
            .iter()
            .filter(|span| columns.iter().any(|col| (span.x - col).abs() <= ALIGN_TOLERANCE))
            .count();
        aligned as f32 / row.spans.len() as f32
    }

    /// Numbered or bulleted lists look like two-column tables.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let (mut bullets, mut numbers) = (0, 0);
        for row in rows {
            if let Some(first) = row.spans.first() {
                let text = first.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let total = rows.len() as f32;
        bullets as f32 / total >= 0.5
            || (columns.len() == 2 && (bullets + numbers) as f32 / total >= 0.5)
    }

    /// Which column a span starts in.
    fn column_for(&self, x: f32, columns: &[f32]) -> usize {
        for (i, &start) in columns.iter().enumerate() {
            let end = columns.get(i + 1).copied().unwrap_or(f32::INFINITY);
            if x >= start - 10.0 && x < end - 10.0 {
                return i;
            }
        }
        columns
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Convert to a table primitive with a top-left-origin corner box.
    ///
    /// Each row reports one keyed cell per column so the column grid can be
    /// inferred downstream.
    pub fn to_primitive(&self, table: &DetectedTable, page: u32, page_height: f32) -> TablePrimitive {
        let columns = &table.columns;

        let mut rows = Vec::with_capacity(table.rows.len());
        let mut cells = Vec::with_capacity(table.rows.len() * columns.len());
        for row in &table.rows {
            let mut contents: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
            for span in &row.spans {
                let col = self.column_for(span.x, columns);
                contents[col].push(span.text.trim());
            }
            rows.push(
                contents
                    .into_iter()
                    .map(|parts| {
                        let text = parts.join(" ");
                        if text.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(text)
                        }
                    })
                    .collect(),
            );

            for (i, &start) in columns.iter().enumerate() {
                let x0 = start.max(table.left_x);
                let x1 = columns.get(i + 1).copied().unwrap_or(table.right_x);
                cells.push(CellGeometry::keyed(x0, x1.max(x0)));
            }
        }

        let first = table.rows.first().map(TableRowData::max_font_size).unwrap_or(0.0);
        let last = table.rows.last().map(TableRowData::max_font_size).unwrap_or(0.0);
        let top = page_height - (table.top_y + first * 0.8);
        let bottom = page_height - (table.bottom_y - last * 0.2);
        let rect = Rect::from_corners(table.left_x, top, table.right_x, bottom);

        TablePrimitive::new(page, rect, rows).with_cells(cells)
    }
}

/// Bullet glyphs used as list markers.
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// Number-style list markers: `1.`, `2)`, `a.`, bare numbers.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }

    let mut chars = cleaned.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.' | ')'), None) if c.is_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, x, y, 10.0)
    }

    fn grid() -> Vec<TextSpan> {
        vec![
            span("Name", 100.0, 700.0),
            span("Age", 200.0, 700.0),
            span("City", 300.0, 700.0),
            span("Alice", 100.0, 685.0),
            span("30", 200.0, 685.0),
            span("Paris", 300.0, 685.0),
            span("Bob", 100.0, 670.0),
            span("25", 200.0, 670.0),
            span("Rome", 300.0, 670.0),
        ]
    }

    #[test]
    fn test_detect_simple_table() {
        let tables = TableDetector::new().detect(&grid());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].columns, vec![100.0, 200.0, 300.0]);
        assert_eq!(tables[0].rows.len(), 3);
    }

    #[test]
    fn test_single_column_is_not_a_table() {
        let spans = vec![
            span("one", 72.0, 700.0),
            span("two", 72.0, 686.0),
            span("three", 72.0, 672.0),
            span("four", 72.0, 658.0),
        ];
        assert!(TableDetector::new().detect(&spans).is_empty());
    }

    #[test]
    fn test_list_is_not_a_table() {
        let spans = vec![
            span("1.", 72.0, 700.0),
            span("First item", 90.0, 700.0),
            span("2.", 72.0, 686.0),
            span("Second item", 90.0, 686.0),
            span("3.", 72.0, 672.0),
            span("Third item", 90.0, 672.0),
        ];
        assert!(TableDetector::new().detect(&spans).is_empty());
    }

    #[test]
    fn test_to_primitive() {
        let detector = TableDetector::new();
        let tables = detector.detect(&grid());
        let table = detector.to_primitive(&tables[0], 2, 792.0);

        assert_eq!(table.page, 2);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][2], CellValue::text("Paris"));
        assert_eq!(table.cells.len(), 9);
        assert_eq!(table.cells[0].horizontal_edges().unwrap(), (100.0, 200.0));

        let rect = table.rect().unwrap();
        assert_eq!(rect.x, 100.0);
        assert!((rect.y - 84.0).abs() < 1e-3);
        assert!((rect.bottom() - 124.0).abs() < 1e-3);
    }

    #[test]
    fn test_markers() {
        assert!(is_bullet_marker("•"));
        assert!(is_number_marker("12."));
        assert!(is_number_marker("b)"));
        assert!(is_number_marker("7"));
        assert!(!is_number_marker("Alice"));
    }
}
