//! PDF Seal Library
//!
//! A library for stamping a translucent seal image onto every page of every
//! PDF under a directory tree, replacing each file in place.
//! This library provides functionality to:
//! - Render a one-page seal overlay sized to any page
//! - Composite that overlay onto existing pages
//! - Replace documents on disk atomically
//! - Walk a directory tree in natural file-name order
//!
//! # Example
//!
//! ```no_run
//! use pdf_seal::config::StampConfig;
//! use pdf_seal::pdf::Stamper;
//! use pdf_seal::walk::process_tree;
//! use std::path::Path;
//!
//! let stamper = Stamper::new(StampConfig::new("signature_ent.png"))
//!     .expect("Failed to load seal");
//! let summary = process_tree(Path::new("pdfs"), &stamper)
//!     .expect("Failed to scan folder");
//! println!("{} of {} PDFs signed", summary.succeeded, summary.total);
//! ```

pub mod error;
pub mod config;
pub mod pdf;
pub mod replace;
pub mod walk;

// Re-export commonly used items
pub use error::{Error, FailureKind, Result};
