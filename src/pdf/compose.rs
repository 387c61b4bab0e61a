//! Overlay compositing using lopdf
//!
//! The overlay page is turned into a Form XObject inside the target document
//! and invoked from a content stream appended to each target page. The
//! original page content is wrapped in `q`/`Q` so its graphics state cannot
//! leak into the seal.

use std::collections::{BTreeSet, HashMap};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use crate::error::{Error, Result};
use crate::pdf::metadata::{inherited_attribute, resolve, PageGeometry};
use crate::pdf::stamp::Overlay;

/// Prefix for the XObject resource names we add to pages
const SEAL_RESOURCE_PREFIX: &str = "PdfSeal";

/// An overlay copied into a target document as a Form XObject
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedOverlay {
    /// Form XObject holding the overlay's drawing
    pub xobject_id: ObjectId,
    /// Canvas size of the overlay (the Form's BBox)
    pub geometry: PageGeometry,
}

/// Copy an overlay page into `target` as a Form XObject.
///
/// Only the objects reachable from the overlay page's resources are copied,
/// each under a fresh id in `target`.
pub fn import_overlay(target: &mut Document, overlay: &Overlay) -> Result<ImportedOverlay> {
    let source = overlay.document();
    let page = source.get_dictionary(overlay.page_id())?;

    let resources = match page.get(b"Resources") {
        Ok(res) => resolve(source, res)?.clone(),
        Err(_) => Object::Dictionary(Dictionary::new()),
    };

    // Gather every object the resources depend on
    let mut reachable = BTreeSet::new();
    collect_references(source, &resources, &mut reachable);

    let mut id_map: HashMap<ObjectId, ObjectId> = HashMap::new();
    for old_id in &reachable {
        id_map.insert(*old_id, target.new_object_id());
    }

    for old_id in &reachable {
        let object = source.get_object(*old_id)?;
        target.objects.insert(id_map[old_id], renumber_object_references(object, &id_map));
    }

    let content = source.get_page_content(overlay.page_id())?;
    let geometry = overlay.geometry();

    let form = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(geometry.width),
                Object::Real(geometry.height),
            ],
            "Resources" => renumber_object_references(&resources, &id_map),
        },
        content,
    );

    Ok(ImportedOverlay {
        xobject_id: target.add_object(form),
        geometry,
    })
}

/// Draw an imported overlay on top of one page of `target`.
///
/// Only `/Contents` and `/Resources` of the page are rewritten; every other
/// page attribute is left as it was.
pub fn composite(
    target: &mut Document,
    page_id: ObjectId,
    overlay: &ImportedOverlay,
    origin: (f32, f32),
) -> Result<()> {
    let mut resources = effective_resources(target, page_id)?;

    let mut xobjects = match resources.get(b"XObject") {
        Ok(xo) => resolve(target, xo)?.as_dict()?.clone(),
        Err(_) => Dictionary::new(),
    };

    let name = unused_resource_name(&xobjects);
    xobjects.set(name.as_bytes().to_vec(), Object::Reference(overlay.xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let existing = content_references(target, page_id)?;

    let mut contents = Vec::with_capacity(existing.len() + 2);
    if !existing.is_empty() {
        let save_id = target.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        contents.push(Object::Reference(save_id));
        contents.extend(existing);
    }

    let mut operations = Vec::new();
    if !contents.is_empty() {
        operations.push(Operation::new("Q", vec![]));
    }
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![
            Object::Real(1.0),
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(1.0),
            Object::Real(origin.0),
            Object::Real(origin.1),
        ],
    ));
    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
    operations.push(Operation::new("Q", vec![]));

    let stamp_content = Content { operations }.encode()?;
    let stamp_id = target.add_object(Stream::new(Dictionary::new(), stamp_content));
    contents.push(Object::Reference(stamp_id));

    let page = target.get_object_mut(page_id)?;
    if let Object::Dictionary(ref mut page_dict) = page {
        page_dict.set("Contents", Object::Array(contents));
        page_dict.set("Resources", Object::Dictionary(resources));
        Ok(())
    } else {
        Err(Error::General(format!("Page {:?} is not a dictionary", page_id)))
    }
}

/// The page's resources as an owned dictionary, materialising inheritance
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    match inherited_attribute(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => Ok(dict.clone()),
        Some(_) => Err(Error::General(format!("Page {:?} has malformed Resources", page_id))),
        None => Ok(Dictionary::new()),
    }
}

/// Content stream references of a page, flattening an indirect array
fn content_references(doc: &Document, page_id: ObjectId) -> Result<Vec<Object>> {
    let page = doc.get_dictionary(page_id)?;

    let contents = match page.get(b"Contents") {
        Ok(contents) => contents,
        Err(_) => return Ok(Vec::new()),
    };

    match contents {
        Object::Reference(id) => match doc.get_object(*id)? {
            Object::Array(items) => Ok(items.clone()),
            _ => Ok(vec![Object::Reference(*id)]),
        },
        Object::Array(items) => Ok(items.clone()),
        _ => Err(Error::General(format!("Page {:?} has malformed Contents", page_id))),
    }
}

/// First `PdfSealN` name not already present in the XObject dictionary
fn unused_resource_name(xobjects: &Dictionary) -> String {
    (0..)
        .map(|n| format!("{}{}", SEAL_RESOURCE_PREFIX, n))
        .find(|name| !xobjects.has(name.as_bytes()))
        .unwrap_or_else(|| SEAL_RESOURCE_PREFIX.to_string())
}

/// Record every object id reachable from `object`
fn collect_references(doc: &Document, object: &Object, seen: &mut BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) => {
            if seen.insert(*id) {
                if let Ok(target) = doc.get_object(*id) {
                    collect_references(doc, target, seen);
                }
            }
        }
        Object::Array(items) => {
            for item in items {
                collect_references(doc, item, seen);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(doc, value, seen);
            }
        }
        _ => {}
    }
}

/// Renumber all object references in an object
fn renumber_object_references(object: &Object, id_map: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(old_id) => Object::Reference(*id_map.get(old_id).unwrap_or(old_id)),
        Object::Array(arr) => {
            Object::Array(arr.iter().map(|obj| renumber_object_references(obj, id_map)).collect())
        }
        Object::Dictionary(dict) => Object::Dictionary(renumber_dictionary(dict, id_map)),
        Object::Stream(stream) => {
            let mut new_stream = stream.clone();
            new_stream.dict = renumber_dictionary(&stream.dict, id_map);
            Object::Stream(new_stream)
        }
        _ => object.clone(),
    }
}

fn renumber_dictionary(dict: &Dictionary, id_map: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        new_dict.set(key.clone(), renumber_object_references(value, id_map));
    }
    new_dict
}
