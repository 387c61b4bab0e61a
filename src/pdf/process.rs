//! Whole-document stamping
//!
//! A [`Stamper`] owns the validated configuration and the decoded seal image
//! for one run. Each document is loaded, stamped page by page, serialised and
//! handed to the atomic replacer; a failure only affects the document at hand.

use std::collections::HashMap;
use std::path::Path;
use lopdf::Document;
use tracing::{debug, error, info, instrument};
use crate::config::StampConfig;
use crate::error::{Error, FailureKind, Result};
use crate::pdf::compose::{composite, import_overlay, ImportedOverlay};
use crate::pdf::metadata::page_geometry;
use crate::pdf::stamp::{render_stamp, supports_transparency, StampAsset};
use crate::replace::replace_in_place;

/// Result of stamping one document
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The document was replaced by its stamped version
    Stamped { pages: usize },
    /// The document was left untouched
    Failed { kind: FailureKind, detail: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Stamped { .. })
    }

    /// Pages stamped; zero for a failed document
    pub fn pages_stamped(&self) -> usize {
        match self {
            Outcome::Stamped { pages } => *pages,
            Outcome::Failed { .. } => 0,
        }
    }
}

/// Applies one seal configuration to any number of documents
#[derive(Debug, Clone)]
pub struct Stamper {
    config: StampConfig,
    asset: StampAsset,
}

impl Stamper {
    /// Validate the configuration and load the seal image.
    ///
    /// A missing or undecodable image is reported here, before any document
    /// is touched.
    pub fn new(config: StampConfig) -> Result<Self> {
        config.validate()?;
        let asset = StampAsset::load(&config.image_path)?;
        Ok(Self { config, asset })
    }

    /// Build from an already decoded image
    pub fn with_asset(config: StampConfig, asset: StampAsset) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, asset })
    }

    pub fn config(&self) -> &StampConfig {
        &self.config
    }

    /// Stamp every page of `path` and replace the file in place.
    ///
    /// Never panics or returns early on a bad document; the failure is logged
    /// and reported through [`Outcome::Failed`].
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn stamp_document(&self, path: &Path) -> Outcome {
        info!("Processing PDF: {}", path.display());

        match self.try_stamp_document(path) {
            Ok(pages) => {
                info!(pages, "Signed: {}", path.display());
                Outcome::Stamped { pages }
            }
            Err(err) => {
                let kind = err.kind();
                error!(%kind, "Error signing {}: {}", path.display(), err);
                Outcome::Failed { kind, detail: err.to_string() }
            }
        }
    }

    /// Stamp an in-memory document, returning the number of pages stamped
    pub fn stamp_loaded(&self, doc: &mut Document) -> Result<usize> {
        let pages: Vec<_> = doc.get_pages().into_iter().collect();
        let total = pages.len();
        let transparency = supports_transparency(&doc.version);

        // Pages of equal size share one imported overlay
        let mut overlays: HashMap<(u32, u32), ImportedOverlay> = HashMap::new();

        for (page_number, page_id) in pages {
            debug!(page = page_number, total, "Stamping page");

            let geometry = page_geometry(doc, page_id)?;
            let imported = match overlays.get(&geometry.size_key()) {
                Some(imported) => *imported,
                None => {
                    let overlay = render_stamp(&geometry, &self.asset, &self.config, transparency)?;
                    let imported = import_overlay(doc, &overlay)?;
                    overlays.insert(geometry.size_key(), imported);
                    imported
                }
            };

            composite(doc, page_id, &imported, (geometry.origin_x, geometry.origin_y))?;
        }

        Ok(total)
    }

    fn try_stamp_document(&self, path: &Path) -> Result<usize> {
        let mut doc = load_document(path)?;
        info!("  -> Total pages: {}", doc.get_pages().len());

        let pages = self.stamp_loaded(&mut doc)?;

        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|err| Error::WriteFailure {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, err.to_string()),
        })?;

        replace_in_place(path, &bytes)?;
        Ok(pages)
    }
}

/// Load a document for stamping, rejecting ones we cannot safely rewrite
fn load_document(path: &Path) -> Result<Document> {
    let unreadable = |reason: String| Error::UnreadableDocument {
        path: path.to_path_buf(),
        reason,
    };

    let doc = Document::load(path).map_err(|err| unreadable(err.to_string()))?;

    if doc.is_encrypted() {
        return Err(unreadable("encrypted documents are not supported".to_string()));
    }
    if doc.get_pages().is_empty() {
        return Err(unreadable("document has no pages".to_string()));
    }

    Ok(doc)
}
