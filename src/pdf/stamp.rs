//! Seal overlay rendering using lopdf
//!
//! An overlay is a complete one-page PDF whose MediaBox matches the target
//! page exactly and whose only content is the seal image.

use std::path::Path;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};
use crate::config::StampConfig;
use crate::error::{Error, Result};
use crate::pdf::metadata::PageGeometry;

/// Resource name of the seal image inside the overlay page
const SEAL_IMAGE: &str = "Seal";
/// Resource name of the opacity graphics state inside the overlay page
const SEAL_GSTATE: &str = "SealGS";

/// Decoded seal image, ready to embed as an image XObject
#[derive(Debug, Clone)]
pub struct StampAsset {
    width: u32,
    height: u32,
    /// 8-bit RGB samples, row-major
    rgb: Vec<u8>,
    /// 8-bit alpha samples; `None` when every pixel is opaque
    alpha: Option<Vec<u8>>,
}

impl StampAsset {
    /// Load and decode a PNG or JPEG seal image
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::AssetNotFound {
                path: path.to_path_buf(),
                reason: "no such file".to_string(),
            });
        }

        let image = image::open(path).map_err(|err| Error::AssetNotFound {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let asset = Self::from_rgba(image.to_rgba8());
        debug!(
            path = %path.display(),
            width = asset.width,
            height = asset.height,
            masked = asset.alpha.is_some(),
            "Seal image loaded"
        );
        Ok(asset)
    }

    /// Split an RGBA buffer into colour samples and an optional soft mask
    pub fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let raw = image.into_raw();

        let mut rgb = Vec::with_capacity(raw.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(raw.len() / 4);
        for pixel in raw.chunks_exact(4) {
            rgb.extend_from_slice(&pixel[..3]);
            alpha.push(pixel[3]);
        }

        let alpha = if alpha.iter().all(|&a| a == u8::MAX) { None } else { Some(alpha) };

        Self { width, height, rgb, alpha }
    }

    /// Pixel dimensions of the image
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the image carries a soft mask
    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    fn image_dict(&self, color_space: &str) -> lopdf::Dictionary {
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
        }
    }
}

/// A rendered single-page overlay document
#[derive(Debug)]
pub struct Overlay {
    document: Document,
    page_id: ObjectId,
    geometry: PageGeometry,
}

impl Overlay {
    /// The overlay document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the overlay's only page
    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Canvas size of the overlay page
    pub fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Serialise the overlay as a standalone PDF
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.document.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// Whether a document of this PDF version can carry constant alpha and soft masks
pub fn supports_transparency(version: &str) -> bool {
    let mut parts = version.trim().split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    match major {
        Some(major) => major > 1 || (major == 1 && minor >= 4),
        None => true,
    }
}

/// Render the seal onto a fresh page of exactly `geometry`'s size.
///
/// With `transparency` off the seal is drawn fully opaque and the image's
/// soft mask is left out, since both need PDF 1.4.
pub fn render_stamp(
    geometry: &PageGeometry,
    asset: &StampAsset,
    config: &StampConfig,
    transparency: bool,
) -> Result<Overlay> {
    if !geometry.is_valid() {
        return Err(Error::UnsupportedGeometry {
            width: geometry.width,
            height: geometry.height,
        });
    }

    debug!(width = geometry.width, height = geometry.height, "Rendering seal overlay");

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut image_dict = asset.image_dict("DeviceRGB");
    if let Some(alpha) = asset.alpha.as_ref().filter(|_| transparency) {
        let smask_id = doc.add_object(Stream::new(asset.image_dict("DeviceGray"), alpha.clone()));
        image_dict.set("SMask", smask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, asset.rgb.clone()));

    let mut resources = dictionary! {
        "XObject" => dictionary! { SEAL_IMAGE => image_id },
    };

    let mut operations = vec![Operation::new("q", vec![])];

    if transparency {
        let gs_id = doc.add_object(dictionary! {
            "Type" => "ExtGState",
            "ca" => Object::Real(config.opacity),
            "CA" => Object::Real(config.opacity),
        });
        resources.set("ExtGState", dictionary! { SEAL_GSTATE => gs_id });
        operations.push(Operation::new("gs", vec![Object::Name(SEAL_GSTATE.as_bytes().to_vec())]));
    } else {
        warn!("Transparency not supported by the target document; continuing without alpha");
    }

    operations.push(Operation::new(
        "cm",
        vec![
            Object::Real(config.width),
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(config.height),
            Object::Real(config.offset_x),
            Object::Real(config.offset_y),
        ],
    ));
    operations.push(Operation::new("Do", vec![Object::Name(SEAL_IMAGE.as_bytes().to_vec())]));
    operations.push(Operation::new("Q", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(geometry.width),
            Object::Real(geometry.height),
        ],
        "Resources" => resources,
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(Overlay {
        document: doc,
        page_id,
        geometry: PageGeometry::new(geometry.width, geometry.height),
    })
}
