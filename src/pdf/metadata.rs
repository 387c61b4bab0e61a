//! Page geometry and document metadata

use std::path::Path;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::error::{Error, Result};

/// Deepest page-tree chain followed when looking up inherited attributes
const MAX_INHERIT_DEPTH: usize = 32;

/// Size and origin of one page, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Lower-left x of the MediaBox
    pub origin_x: f32,
    /// Lower-left y of the MediaBox
    pub origin_y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageGeometry {
    /// Geometry of a page whose MediaBox starts at the origin
    pub fn new(width: f32, height: f32) -> Self {
        Self { origin_x: 0.0, origin_y: 0.0, width, height }
    }

    /// Build from a MediaBox `[llx lly urx ury]`, normalising swapped corners
    pub fn from_rect(rect: [f32; 4]) -> Self {
        let [x0, y0, x1, y1] = rect;
        Self {
            origin_x: x0.min(x1),
            origin_y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Both dimensions are finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Cache key for overlays of this size
    pub(crate) fn size_key(&self) -> (u32, u32) {
        (self.width.to_bits(), self.height.to_bits())
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Geometry of every page, in page order
    pub pages: Vec<PageGeometry>,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// PDF header version, e.g. "1.7"
    pub version: String,
}

/// Follow a reference to the object it points at
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Look up a page attribute, walking up the `/Parent` chain for inheritable keys
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut dict: &Dictionary = doc.get_dictionary(page_id)?;

    for _ in 0..MAX_INHERIT_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Ok(Some(resolve(doc, value)?));
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => dict = doc.get_dictionary(*parent_id)?,
            _ => return Ok(None),
        }
    }

    Ok(None)
}

/// Read a page's MediaBox (inherited if necessary)
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")?
        .ok_or_else(|| Error::General(format!("Page {:?} has no MediaBox", page_id)))?;

    let values = match media_box {
        Object::Array(values) if values.len() == 4 => values,
        _ => return Err(Error::General(format!("Page {:?} has a malformed MediaBox", page_id))),
    };

    let mut rect = [0.0f32; 4];
    for (slot, value) in rect.iter_mut().zip(values.iter()) {
        *slot = resolve(doc, value)?.as_float()?;
    }

    Ok(PageGeometry::from_rect(rect))
}

/// Geometry of every page in document order
pub fn page_geometries(doc: &Document) -> Result<Vec<PageGeometry>> {
    doc.get_pages()
        .values()
        .map(|&page_id| page_geometry(doc, page_id))
        .collect()
}

fn info_string(doc: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let value = info.get(key).ok()?;
    let bytes = resolve(doc, value).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let pages = page_geometries(&doc)?;

    if pages.is_empty() {
        return Err(Error::General(format!("PDF has no pages: {}", path.display())));
    }

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| resolve(&doc, info).ok())
        .and_then(|info| info.as_dict().ok());

    let (title, author) = match info {
        Some(info) => (info_string(&doc, info, b"Title"), info_string(&doc, info, b"Author")),
        None => (None, None),
    };

    Ok(PdfMetadata {
        page_count: pages.len(),
        pages,
        title,
        author,
        version: doc.version.clone(),
    })
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}
