//! Rendering of resolved documents to an output canvas.

mod options;
mod pdf_surface;
mod renderer;
mod result;
mod surface;

pub use options::RenderOptions;
pub use pdf_surface::PdfSurface;
pub use renderer::CanvasRenderer;
pub use result::{DrawOutcome, DrawRecord, PageOutcome, RenderReport};
pub use surface::{DrawSurface, RecordingSurface, SurfaceOp};
