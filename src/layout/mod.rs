//! Layout resolution between extraction and rendering.
//!
//! Three passes, applied in order:
//!
//! 1. [`overlap`] removes free text already represented inside a table.
//! 2. [`grid`] infers table column widths from raw cell edges.
//! 3. [`planner`] converts every primitive into canvas-space draw geometry.

pub mod grid;
pub mod overlap;
pub mod planner;

pub use grid::{apply_column_grid, infer_column_widths, ColumnGrid};
pub use overlap::{remove_table_text, OverlapPolicy, OverlapResolver};
pub use planner::{
    PagePlan, PlacementOptions, PlacementPlanner, PlanSkip, PlannedImage, PlannedLine,
    PlannedTable, PlannedText, PrimitiveKind,
};
