//! Batch-apply a logo watermark to product photos.
//!
//! A PNG logo is scaled relative to each photo's width, faded to the chosen
//! opacity and alpha-composited either at one of five anchors or tiled across
//! the whole photo. Results are flattened to opaque RGB and written as JPEG.
//!
//! # Quick Start
//!
//! ```no_run
//! use logo_watermarker::{Placement, Position, Watermarker};
//!
//! let placement = Placement {
//!     position: Position::BottomRight,
//!     scale_percent: 20.0,
//!     opacity_percent: 80.0,
//!     repeat: false,
//! };
//! let wm = Watermarker::open("logo.png".as_ref(), placement).expect("logo loads");
//! let result = wm.process_file("photo.jpg".as_ref(), "photo_watermarked.jpg".as_ref());
//! assert!(result.success());
//! ```
//!
//! # Batches
//!
//! Batches run one file at a time. A file that fails to load or compose is
//! recorded in the [`BatchReport`] and the remaining files are still
//! processed.
//!
//! ```no_run
//! use std::path::PathBuf;
//! use logo_watermarker::{Placement, Watermarker};
//!
//! let wm = Watermarker::open("logo.png".as_ref(), Placement::default()).unwrap();
//! let inputs = vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")];
//! let report = wm.process_batch(&inputs, Some("out".as_ref()), |p| {
//!     println!("{}/{}", p.completed, p.total);
//! });
//! if let Some(summary) = report.failure_summary() {
//!     eprintln!("Some files failed:\n{summary}");
//! }
//! ```

#![deny(missing_docs)]

pub mod batch;
pub mod compositor;
pub mod error;
pub mod settings;

pub use batch::{
    is_supported_image, is_supported_logo, load_image, output_path_for, save_image,
    BatchProgress, BatchReport, ImageQueue, ProcessResult, WatermarkJob, Watermarker,
    DEFAULT_JPEG_QUALITY,
};
pub use compositor::{
    composite, Placement, Position, ANCHOR_MARGIN, MAX_LOGO_PIXELS, TILE_PADDING,
};
pub use error::{Error, ErrorKind, Result};
pub use settings::{Settings, DEFAULT_SETTINGS_FILE};
