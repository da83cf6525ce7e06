//! Column geometry inferred from raw cell edges.
//!
//! Every distinct left and right cell edge becomes a column boundary; widths
//! are the gaps between consecutive boundaries. Merged or irregular cells
//! simply contribute more boundaries, there is no span detection.

use crate::model::{CellGeometry, Rect, TablePrimitive, EPSILON};

/// Sorted, de-duplicated column boundaries of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnGrid {
    edges: Vec<f32>,
    skipped_cells: usize,
}

impl ColumnGrid {
    /// Collect boundaries from cell geometry. Unparseable cells are skipped.
    pub fn from_cells(cells: &[CellGeometry]) -> Self {
        let mut edges = Vec::with_capacity(cells.len() * 2);
        let mut skipped_cells = 0;

        for cell in cells {
            match cell.horizontal_edges() {
                Ok((x0, x1)) => {
                    edges.push(x0);
                    edges.push(x1);
                }
                Err(e) => {
                    log::warn!("skipping cell: {}", e);
                    skipped_cells += 1;
                }
            }
        }

        let mut grid = Self {
            edges,
            skipped_cells,
        };
        grid.normalize();
        grid
    }

    /// Same as [`ColumnGrid::from_cells`], with every boundary clamped into `bounds`.
    pub fn from_cells_within(cells: &[CellGeometry], bounds: &Rect) -> Self {
        let mut grid = Self::from_cells(cells);
        for edge in &mut grid.edges {
            *edge = edge.clamp(bounds.x, bounds.right());
        }
        grid.normalize();
        grid
    }

    fn normalize(&mut self) {
        self.edges.sort_by(|a, b| a.total_cmp(b));
        self.edges.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    }

    /// Column boundaries in ascending order.
    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Number of cells that could not be parsed.
    pub fn skipped_cells(&self) -> usize {
        self.skipped_cells
    }

    /// Widths between consecutive boundaries (one fewer than the edges).
    pub fn widths(&self) -> Vec<f32> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

/// Infer column widths for a table from its cells.
///
/// Edges are clamped into the table box when it is valid, so the widths
/// never sum past the box width.
pub fn infer_column_widths(table: &TablePrimitive) -> Vec<f32> {
    let grid = match table.rect() {
        Ok(rect) => ColumnGrid::from_cells_within(&table.cells, &rect),
        Err(_) => ColumnGrid::from_cells(&table.cells),
    };
    grid.widths()
}

/// Fill `column_widths` of every table from its cell geometry.
///
/// Tables without cells keep the widths they arrived with.
pub fn apply_column_grid(tables: &mut [TablePrimitive]) {
    for table in tables.iter_mut() {
        if table.cells.is_empty() {
            continue;
        }
        table.column_widths = infer_column_widths(table);
        log::debug!(
            "table on page {}: {} columns inferred",
            table.page,
            table.column_widths.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_from_edges() {
        let cells = vec![
            CellGeometry::keyed(100.0, 180.0),
            CellGeometry::keyed(180.0, 220.0),
            CellGeometry::positional(220.0, 100.0, 300.0, 130.0),
            CellGeometry::keyed(100.0, 220.0),
        ];
        let grid = ColumnGrid::from_cells(&cells);
        assert_eq!(grid.edges(), &[100.0, 180.0, 220.0, 300.0]);
        assert_eq!(grid.widths(), vec![80.0, 40.0, 80.0]);
    }

    #[test]
    fn test_unparseable_cells_skipped() {
        let cells = vec![
            CellGeometry::keyed(0.0, 50.0),
            CellGeometry::Unrecognized(serde_json::json!("garbage")),
            CellGeometry::Positional(vec![serde_json::json!(1.0)]),
            CellGeometry::keyed(50.0, 90.0),
        ];
        let grid = ColumnGrid::from_cells(&cells);
        assert_eq!(grid.skipped_cells(), 2);
        assert_eq!(grid.widths(), vec![50.0, 40.0]);
    }

    #[test]
    fn test_near_duplicate_edges_merge() {
        let cells = vec![
            CellGeometry::keyed(10.0, 20.0),
            CellGeometry::keyed(20.0004, 30.0),
        ];
        let grid = ColumnGrid::from_cells(&cells);
        assert_eq!(grid.edges().len(), 3);
    }

    #[test]
    fn test_no_cells() {
        let grid = ColumnGrid::from_cells(&[]);
        assert!(grid.edges().is_empty());
        assert!(grid.widths().is_empty());
    }

    #[test]
    fn test_clamped_to_table_box() {
        let mut table = TablePrimitive::new(1, Rect::from_corners(100.0, 0.0, 300.0, 50.0), vec![]);
        table.cells = vec![
            CellGeometry::keyed(95.0, 180.0),
            CellGeometry::keyed(180.0, 310.0),
        ];
        let widths = infer_column_widths(&table);
        assert_eq!(widths, vec![80.0, 120.0]);
        assert!(widths.iter().sum::<f32>() <= 200.0 + EPSILON);
    }

    #[test]
    fn test_apply_column_grid() {
        let mut tables = vec![TablePrimitive::new(
            1,
            Rect::from_corners(100.0, 100.0, 300.0, 160.0),
            vec![vec!["a".into(), "b".into(), "c".into()]],
        )
        .with_cells(vec![
            CellGeometry::keyed(100.0, 180.0),
            CellGeometry::keyed(180.0, 220.0),
            CellGeometry::keyed(220.0, 300.0),
        ])];
        apply_column_grid(&mut tables);
        assert_eq!(tables[0].column_widths, vec![80.0, 40.0, 80.0]);
    }

    #[test]
    fn test_given_widths_kept_without_cells() {
        let mut table = TablePrimitive::new(1, Rect::from_corners(100.0, 0.0, 300.0, 50.0), vec![]);
        table.column_widths = vec![80.0, 40.0, 80.0];
        let mut tables = vec![table];
        apply_column_grid(&mut tables);
        assert_eq!(tables[0].column_widths, vec![80.0, 40.0, 80.0]);
    }
}
