//! Per-draw outcomes and the rebuild report.

use serde::Serialize;
use std::path::PathBuf;

use crate::font::FontState;
use crate::layout::{PlanSkip, PrimitiveKind};
use crate::model::PageSize;

/// Result of drawing one primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum DrawOutcome {
    /// The primitive is on the page
    Drawn,
    /// The primitive was left out
    Skipped(String),
}

impl DrawOutcome {
    /// Check if the primitive was drawn.
    pub fn is_drawn(&self) -> bool {
        matches!(self, DrawOutcome::Drawn)
    }
}

/// Outcome of one primitive, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRecord {
    /// Kind of primitive
    pub kind: PrimitiveKind,
    /// What happened
    pub outcome: DrawOutcome,
}

/// Everything that happened on one output page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOutcome {
    /// Page number (1-indexed)
    pub page: u32,
    /// Output page size
    pub size: PageSize,
    /// Per-primitive outcomes in draw order
    pub draws: Vec<DrawRecord>,
}

impl PageOutcome {
    /// Create an outcome for a page with nothing recorded yet.
    pub fn new(page: u32, size: PageSize) -> Self {
        Self {
            page,
            size,
            draws: Vec::new(),
        }
    }

    /// Record an outcome.
    pub fn record(&mut self, kind: PrimitiveKind, outcome: DrawOutcome) {
        self.draws.push(DrawRecord { kind, outcome });
    }

    /// Record primitives dropped while planning.
    pub fn record_plan_skips(&mut self, skips: &[PlanSkip]) {
        for skip in skips {
            self.record(skip.kind, DrawOutcome::Skipped(skip.reason.clone()));
        }
    }

    /// Number of drawn primitives.
    pub fn drawn_count(&self) -> usize {
        self.draws.iter().filter(|d| d.outcome.is_drawn()).count()
    }

    /// Number of skipped primitives.
    pub fn skipped_count(&self) -> usize {
        self.draws.len() - self.drawn_count()
    }
}

/// Summary of a whole rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    /// Output file, once saved
    pub output: Option<PathBuf>,
    /// Name of the font used for all text
    pub font: String,
    /// Whether the primary font was used
    pub font_state: FontState,
    /// Text blocks removed because a table covers them
    pub suppressed_blocks: usize,
    /// Per-page outcomes, in page order
    pub pages: Vec<PageOutcome>,
}

impl RenderReport {
    /// Create an empty report.
    pub fn new(font: impl Into<String>, font_state: FontState) -> Self {
        Self {
            output: None,
            font: font.into(),
            font_state,
            suppressed_blocks: 0,
            pages: Vec::new(),
        }
    }

    /// Number of output pages.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total drawn primitives.
    pub fn drawn_count(&self) -> usize {
        self.pages.iter().map(|p| p.drawn_count()).sum()
    }

    /// Total skipped primitives.
    pub fn skipped_count(&self) -> usize {
        self.pages.iter().map(|p| p.skipped_count()).sum()
    }

    /// Iterate skipped primitives as `(page, kind, reason)`.
    pub fn skips(&self) -> impl Iterator<Item = (u32, PrimitiveKind, &str)> + '_ {
        self.pages.iter().flat_map(|page| {
            page.draws.iter().filter_map(move |d| match &d.outcome {
                DrawOutcome::Skipped(reason) => Some((page.page, d.kind, reason.as_str())),
                DrawOutcome::Drawn => None,
            })
        })
    }

    /// Serialize to JSON.
    pub fn to_json(&self, pretty: bool) -> crate::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_outcome_counts() {
        let mut page = PageOutcome::new(1, PageSize::letter());
        page.record(PrimitiveKind::Image, DrawOutcome::Drawn);
        page.record(PrimitiveKind::Text, DrawOutcome::Skipped("bad box".into()));
        page.record(PrimitiveKind::Text, DrawOutcome::Drawn);
        assert_eq!(page.drawn_count(), 2);
        assert_eq!(page.skipped_count(), 1);
    }

    #[test]
    fn test_report_aggregates_pages() {
        let mut report = RenderReport::new("Helvetica", FontState::Fallback);
        let mut one = PageOutcome::new(1, PageSize::letter());
        one.record(PrimitiveKind::Table, DrawOutcome::Drawn);
        let mut two = PageOutcome::new(2, PageSize::a4());
        two.record_plan_skips(&[PlanSkip {
            kind: PrimitiveKind::Text,
            reason: "no box".into(),
        }]);
        report.pages = vec![one, two];

        assert_eq!(report.page_count(), 2);
        assert_eq!(report.drawn_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        let skips: Vec<_> = report.skips().collect();
        assert_eq!(skips, vec![(2, PrimitiveKind::Text, "no box")]);
    }

    #[test]
    fn test_report_json() {
        let mut report = RenderReport::new("Helvetica", FontState::Fallback);
        let mut page = PageOutcome::new(1, PageSize::letter());
        page.record(PrimitiveKind::Image, DrawOutcome::Skipped("missing".into()));
        report.pages.push(page);

        let json = report.to_json(false).unwrap();
        assert!(json.contains(r#""font_state":"fallback""#));
        assert!(json.contains(r#""status":"skipped","reason":"missing""#));
        assert!(json.contains(r#""kind":"image""#));
    }
}
