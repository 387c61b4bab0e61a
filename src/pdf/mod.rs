//! PDF manipulation module

pub mod metadata;
pub mod stamp;
pub mod compose;
pub mod process;

// Re-export commonly used items
pub use metadata::{count_pages, extract_metadata, page_geometries, page_geometry, PageGeometry, PdfMetadata};
pub use stamp::{render_stamp, supports_transparency, Overlay, StampAsset};
pub use compose::{composite, import_overlay, ImportedOverlay};
pub use process::{Outcome, Stamper};
