//! Stamp configuration and resource lookup
//!
//! The configuration is built once at startup and passed by reference into
//! every stage of the pipeline.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the directory a bundled build extracts its
/// resources into.
pub const RESOURCE_DIR_ENV: &str = "PDF_SEAL_RESOURCE_DIR";

/// Name of the folder scanned by default, next to the executable.
pub const DEFAULT_ROOT_DIR: &str = "pdfs";

/// Seal assets shipped alongside the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealChoice {
    Enterprise,
    Manufacturing,
}

impl SealChoice {
    /// File name of the seal image for this choice
    pub fn asset_name(&self) -> &'static str {
        match self {
            SealChoice::Enterprise => "signature_ent.png",
            SealChoice::Manufacturing => "signature_man.png",
        }
    }

    /// Human-readable label used in prompts and logs
    pub fn label(&self) -> &'static str {
        match self {
            SealChoice::Enterprise => "Enterprise",
            SealChoice::Manufacturing => "Manufacturing",
        }
    }

    /// Parse a menu answer ("1"/"2" or the seal name).
    ///
    /// Returns `None` for anything unrecognised; callers fall back to
    /// [`SealChoice::Enterprise`].
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "1" | "enterprise" | "ent" => Some(SealChoice::Enterprise),
            "2" | "manufacturing" | "man" => Some(SealChoice::Manufacturing),
            _ => None,
        }
    }

    /// Resolve this seal's image path and check that it exists
    pub fn resolve(&self) -> Result<PathBuf> {
        let path = resolve_resource(self.asset_name());
        if !path.is_file() {
            return Err(Error::AssetNotFound {
                path,
                reason: "make sure the seal image is in the same folder as the executable"
                    .to_string(),
            });
        }
        Ok(path)
    }
}

/// Stamp placement and appearance
///
/// All lengths are in PDF points, measured from the page's bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct StampConfig {
    /// Seal image (PNG or JPEG)
    pub image_path: PathBuf,
    /// Drawn width of the seal
    pub width: f32,
    /// Drawn height of the seal
    pub height: f32,
    /// Horizontal offset from the left edge
    pub offset_x: f32,
    /// Vertical offset from the bottom edge
    pub offset_y: f32,
    /// Fill and stroke alpha in [0, 1]
    pub opacity: f32,
}

impl StampConfig {
    /// Configuration with the default placement for the given image
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            width: 120.0,
            height: 120.0,
            offset_x: 450.0,
            offset_y: 30.0,
            opacity: 0.40,
        }
    }

    /// Reject values that cannot produce a sensible stamp
    pub fn validate(&self) -> Result<()> {
        if !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "stamp size must be positive, got {} x {}",
                self.width, self.height
            )));
        }
        if !self.offset_x.is_finite() || !self.offset_y.is_finite() {
            return Err(Error::InvalidConfig("stamp offset must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidConfig(format!(
                "opacity must be within [0, 1], got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// Directory holding the tool's bundled resources.
///
/// A packaged build sets [`RESOURCE_DIR_ENV`] to its extraction mount point;
/// otherwise resources live next to the executable.
pub fn resource_dir() -> PathBuf {
    if let Some(dir) = env::var_os(RESOURCE_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    executable_dir()
}

/// Path of a named resource inside [`resource_dir`]
pub fn resolve_resource(name: &str) -> PathBuf {
    resource_dir().join(name)
}

/// Default scan root: `pdfs/` next to the executable
pub fn default_root() -> PathBuf {
    executable_dir().join(DEFAULT_ROOT_DIR)
}

fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
