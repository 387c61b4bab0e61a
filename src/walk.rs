//! Directory tree discovery and batch stamping
//!
//! Documents are found with a recursive, case-insensitive glob, grouped by
//! directory, and ordered inside each directory by the first number in their
//! file name so "Invoice 2.pdf" comes before "Invoice 10.pdf".

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use glob::{glob_with, MatchOptions, Pattern};
use regex::Regex;
use tracing::{info, warn};
use crate::error::{Error, Result};
use crate::pdf::process::{Outcome, Stamper};
use crate::replace::TEMP_SUFFIX;

/// Document file extension, matched case-insensitively
pub const DOCUMENT_EXTENSION: &str = ".pdf";

/// Scratch file name reserved by the stamping tool; never treated as input
pub const RESERVED_STAMP_NAME: &str = "___temp_signature.pdf";

/// Counts for one batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub root: PathBuf,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// No documents matched anywhere under the root
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Sort key for a file name: the first decimal number it contains.
///
/// Names without a number sort after every name that has one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NaturalKey {
    pub has_number: bool,
    pub value: f64,
}

impl NaturalKey {
    fn cmp_key(&self, other: &Self) -> Ordering {
        match (self.has_number, other.has_number) {
            (true, true) => self.value.total_cmp(&other.value),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[0-9]+(\.[0-9]+)?").expect("valid number pattern"))
}

/// Extract the natural sort key from a file name
pub fn natural_sort_key(name: &str) -> NaturalKey {
    match number_pattern().find(name).and_then(|m| m.as_str().parse::<f64>().ok()) {
        Some(value) => NaturalKey { has_number: true, value },
        None => NaturalKey { has_number: false, value: f64::INFINITY },
    }
}

/// Stable sort of paths by the natural key of their file names
pub fn sort_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natural_sort_key(&file_name(a)).cmp_key(&natural_sort_key(&file_name(b))));
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether a file name is a candidate document
pub fn is_document_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(DOCUMENT_EXTENSION)
        && name != RESERVED_STAMP_NAME
        && !lower.ends_with(TEMP_SUFFIX)
}

/// Every candidate document under `root`, grouped by directory in path order
/// and naturally ordered inside each directory
pub fn discover_documents(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::FileNotFound(root.to_path_buf()));
    }

    let root_str = root
        .to_str()
        .ok_or_else(|| Error::InvalidGlob(format!("non UTF-8 root: {}", root.display())))?;
    let pattern = format!("{}/**/*{}", Pattern::escape(root_str), DOCUMENT_EXTENSION);

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let entries = glob_with(&pattern, options).map_err(|e| Error::InvalidGlob(e.to_string()))?;

    let mut by_dir: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if !path.is_file() || !is_document_name(&file_name(&path)) {
                    continue;
                }
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                by_dir.entry(dir).or_default().push(path);
            }
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }

    let mut documents = Vec::new();
    for (dir, mut files) in by_dir {
        sort_naturally(&mut files);
        info!("Found {} PDF(s) in {}", files.len(), dir.display());
        documents.extend(files);
    }

    Ok(documents)
}

/// Stamp every document under `root`.
///
/// A missing root is an error; a document that fails is counted and skipped.
pub fn process_tree(root: &Path, stamper: &Stamper) -> Result<BatchSummary> {
    process_tree_with(root, stamper, |_, _| {})
}

/// [`process_tree`], reporting each document's outcome to `on_document`
pub fn process_tree_with<F>(root: &Path, stamper: &Stamper, mut on_document: F) -> Result<BatchSummary>
where
    F: FnMut(&Path, &Outcome),
{
    info!("Scanning folder: {}", root.display());

    let documents = discover_documents(root)?;
    let mut summary = BatchSummary {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for path in &documents {
        let outcome = stamper.stamp_document(path);
        summary.record(&outcome);
        on_document(path, &outcome);
    }

    if summary.is_empty() {
        warn!("No PDF files found.");
    } else {
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Total PDFs processed: {}",
            summary.total
        );
    }

    Ok(summary)
}
