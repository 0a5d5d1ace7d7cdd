//! Batch watermarking: image queue, per-file processing and output naming.

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage, RgbaImage};

use crate::compositor::{self, Placement};
use crate::error::{Error, Result};

/// Suffix appended to each output file stem.
pub const OUTPUT_SUFFIX: &str = "_watermarked";

/// JPEG quality used for batch output.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Ordered, de-duplicated list of images waiting to be watermarked.
#[derive(Debug, Clone, Default)]
pub struct ImageQueue {
    paths: Vec<PathBuf>,
}

impl ImageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` if it has a supported image extension and is not
    /// already queued. Returns whether it was added.
    pub fn add(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !is_supported_image(&path) || self.paths.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Add several paths, returning how many were accepted.
    pub fn add_all<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        paths.into_iter().map(|p| self.add(p)).filter(|&added| added).count()
    }

    /// Add every supported image directly inside `dir`, in file name order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be read.
    pub fn add_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().map(|ft| ft.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect();
        entries.sort();
        Ok(self.add_all(entries))
    }

    /// Remove the entries at `indices`. Out-of-range indices are ignored.
    pub fn remove_selected(&mut self, indices: &[usize]) {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        for &i in indices.iter().rev() {
            if i < self.paths.len() {
                self.paths.remove(i);
            }
        }
    }

    /// Remove `path` if queued. Returns whether it was present.
    pub fn remove_path(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// Queued paths in insertion order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// First queued path, used for previews.
    #[must_use]
    pub fn first(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// Number of queued images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct WatermarkJob {
    /// Source image.
    pub input: PathBuf,
    /// PNG logo.
    pub logo: PathBuf,
    /// Destination file.
    pub output: PathBuf,
    /// Placement parameters.
    pub placement: Placement,
}

impl WatermarkJob {
    /// Run this job on its own, loading the logo from disk.
    ///
    /// # Errors
    ///
    /// Returns any load, parameter or save error.
    pub fn run(&self) -> Result<()> {
        let watermarker = Watermarker::open(&self.logo, self.placement.clone())?;
        let image = watermarker.render_file(&self.input)?;
        save_image(&image, &self.output, DEFAULT_JPEG_QUALITY)
    }
}

/// Result of processing a single image file.
#[derive(Debug)]
pub struct ProcessResult {
    /// Path of the input file.
    pub path: PathBuf,
    /// Where the output was (or would have been) written.
    pub output: PathBuf,
    /// The failure, if any.
    pub error: Option<Error>,
}

impl ProcessResult {
    /// Whether the output was written.
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// File name of the input, for messages.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(
            || self.path.display().to_string(),
            |f| f.to_string_lossy().to_string(),
        )
    }
}

/// Progress after one batch item, successful or not.
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// Items finished so far, including this one.
    pub completed: usize,
    /// Items in the batch.
    pub total: usize,
    /// The item just finished.
    pub path: &'a Path,
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One result per input, in input order.
    pub results: Vec<ProcessResult>,
}

impl BatchReport {
    /// Number of outputs written.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success()).count()
    }

    /// Results that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ProcessResult> {
        self.results.iter().filter(|r| !r.success())
    }

    /// One `"<file name>: <error>"` line per failure, or `None` if every
    /// item succeeded.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .failures()
            .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.file_name())))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Applies one logo with one placement to many images.
///
/// The logo is decoded once; it is rescaled per image since its size depends
/// on each image's width.
pub struct Watermarker {
    logo: RgbaImage,
    placement: Placement,
    jpeg_quality: u8,
}

impl Watermarker {
    /// Create a watermarker from an already decoded logo.
    ///
    /// The placement is checked once here, so an invalid placement stops a
    /// batch before any file is touched instead of failing every item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the placement is invalid.
    pub fn new(logo: RgbaImage, placement: Placement) -> Result<Self> {
        placement.validate()?;
        Ok(Self {
            logo,
            placement,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        })
    }

    /// Create a watermarker by loading the logo at `logo_path`.
    ///
    /// The logo is decoded once for the whole batch; a logo that cannot be
    /// loaded is reported here rather than once per item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the logo cannot be decoded and
    /// [`Error::InvalidParameter`] if the placement is invalid.
    pub fn open(logo_path: &Path, placement: Placement) -> Result<Self> {
        Self::new(load_image(logo_path)?, placement)
    }

    /// Use `quality` (1-100) for JPEG output.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Placement in use.
    #[must_use]
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Watermark an in-memory image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DegenerateLogo`] if the logo scales to nothing for
    /// this image.
    pub fn apply(&self, base: &RgbaImage) -> Result<RgbImage> {
        compositor::composite(base, &self.logo, &self.placement)
    }

    /// Load `input` and watermark it without saving.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] or a parameter error.
    pub fn render_file(&self, input: &Path) -> Result<RgbImage> {
        let base = load_image(input)?;
        self.apply(&base)
    }

    /// Process a single image file: load, composite, save.
    #[must_use]
    pub fn process_file(&self, input: &Path, output: &Path) -> ProcessResult {
        let error = self.try_process_file(input, output).err();
        match &error {
            None => tracing::debug!(input = %input.display(), output = %output.display(), "watermarked"),
            Some(e) => tracing::debug!(input = %input.display(), "failed: {e}"),
        }
        ProcessResult {
            path: input.to_path_buf(),
            output: output.to_path_buf(),
            error,
        }
    }

    fn try_process_file(&self, input: &Path, output: &Path) -> Result<()> {
        let image = self.render_file(input)?;
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        save_image(&image, output, self.jpeg_quality)
    }

    /// Watermark every path in order, one at a time.
    ///
    /// Outputs go to `output_dir`, or next to each input when `None`.
    /// `on_progress` is called after each item. A failing item never stops
    /// the batch.
    pub fn process_batch<F>(
        &self,
        inputs: &[PathBuf],
        output_dir: Option<&Path>,
        mut on_progress: F,
    ) -> BatchReport
    where
        F: FnMut(BatchProgress<'_>),
    {
        let total = inputs.len();
        let mut report = BatchReport {
            results: Vec::with_capacity(total),
        };

        for (i, input) in inputs.iter().enumerate() {
            let output = output_path_for(input, output_dir);
            report.results.push(self.process_file(input, &output));
            on_progress(BatchProgress {
                completed: i + 1,
                total,
                path: input,
            });
        }

        tracing::info!(
            total,
            succeeded = report.succeeded(),
            failed = total - report.succeeded(),
            "batch finished"
        );
        report
    }
}

/// Check if a file has a supported image extension (`png`, `jpg`, `jpeg`).
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(ext.to_lowercase().as_str(), "jpg" | "jpeg" | "png"),
        None => false,
    }
}

/// Check if a file can be used as a logo (`png` only).
#[must_use]
pub fn is_supported_logo(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Output path for `input`.
///
/// Example: `"shots/photo.png"` becomes `"<output_dir>/photo_watermarked.jpg"`,
/// or `"shots/photo_watermarked.jpg"` without an output directory.
#[must_use]
pub fn output_path_for(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let dir = output_dir.unwrap_or_else(|| input.parent().unwrap_or(Path::new(".")));
    dir.join(format!("{stem}{OUTPUT_SUFFIX}.jpg"))
}

/// Decode the image at `path` as RGBA.
///
/// # Errors
///
/// Returns [`Error::Load`] if the file is missing or not a decodable image.
pub fn load_image(path: &Path) -> Result<RgbaImage> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| Error::Load {
            path: path.to_path_buf(),
            source,
        })
}

/// Save an RGB image, choosing the encoder from the file extension.
///
/// JPEG output uses `jpeg_quality`. The file is created or truncated in
/// place.
///
/// # Errors
///
/// Returns an error if the format is unsupported or writing fails.
pub fn save_image(img: &RgbImage, path: &Path, jpeg_quality: u8) -> Result<()> {
    let format =
        ImageFormat::from_path(path).map_err(|e| Error::UnsupportedFormat(e.to_string()))?;
    let save_err = |source: image::ImageError| Error::Save {
        path: path.to_path_buf(),
        source,
    };

    match format {
        ImageFormat::Jpeg => {
            let file = std::fs::File::create(path)
                .map_err(|e| save_err(image::ImageError::IoError(e)))?;
            let file = std::io::BufWriter::new(file);
            let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(file, jpeg_quality);
            encoder.encode_image(img).map_err(save_err)?;
        }
        ImageFormat::Png | ImageFormat::WebP | ImageFormat::Bmp => {
            img.save_with_format(path, format).map_err(save_err)?;
        }
        _ => {
            return Err(Error::UnsupportedFormat(format!("{format:?}")));
        }
    }

    Ok(())
}
