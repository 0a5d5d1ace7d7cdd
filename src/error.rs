//! Error types for the logo-watermarker crate.

use std::path::PathBuf;

/// Errors that can occur while watermarking images or persisting settings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A source image is missing or cannot be decoded.
    #[error("failed to load image {}: {source}", path.display())]
    Load {
        /// Path that was being loaded.
        path: PathBuf,
        /// Underlying decode or I/O error.
        #[source]
        source: image::ImageError,
    },

    /// A placement parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The scaled logo would have no pixels.
    #[error("scaled logo is degenerate ({width}x{height}); increase the scale")]
    DegenerateLogo {
        /// Computed logo width in pixels.
        width: u32,
        /// Computed logo height in pixels.
        height: u32,
    },

    /// The scaled logo would be too large to allocate.
    #[error("scaled logo is too large ({width}x{height}); reduce the scale")]
    LogoTooLarge {
        /// Computed logo width in pixels.
        width: u32,
        /// Computed logo height in pixels.
        height: u32,
    },

    /// The settings file exists but cannot be read.
    #[error("failed to read settings {}: {source}", path.display())]
    SettingsRead {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for a settings record.
    #[error("malformed settings {}: {source}", path.display())]
    SettingsParse {
        /// Settings file path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The settings file cannot be written.
    #[error("failed to write settings {}: {source}", path.display())]
    SettingsWrite {
        /// Settings file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding or writing an output image failed.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        /// Output path.
        path: PathBuf,
        /// Underlying encode or I/O error.
        #[source]
        source: image::ImageError,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output image format is not supported.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source image could not be loaded.
    Load,
    /// Placement parameters are unusable.
    Parameter,
    /// The settings file could not be read, parsed or written.
    Persistence,
    /// An output file could not be written.
    Output,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Load { .. } => ErrorKind::Load,
            Error::InvalidParameter(_)
            | Error::DegenerateLogo { .. }
            | Error::LogoTooLarge { .. } => ErrorKind::Parameter,
            Error::SettingsRead { .. } | Error::SettingsParse { .. } | Error::SettingsWrite { .. } => {
                ErrorKind::Persistence
            }
            Error::Save { .. } | Error::Io(_) | Error::UnsupportedFormat(_) => ErrorKind::Output,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let io_err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io_err.to_string().contains("gone"));

        let unsupported = Error::UnsupportedFormat("tiff".to_string());
        assert!(unsupported.to_string().contains("tiff"));

        let degenerate = Error::DegenerateLogo {
            width: 0,
            height: 0,
        };
        assert!(degenerate.to_string().contains("0x0"));

        let write = Error::SettingsWrite {
            path: PathBuf::from("/ro/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = write.to_string();
        assert!(msg.contains("/ro/settings.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn errors_are_classified() {
        assert_eq!(
            Error::InvalidParameter("scale".into()).kind(),
            ErrorKind::Parameter
        );
        assert_eq!(
            Error::DegenerateLogo {
                width: 3,
                height: 0
            }
            .kind(),
            ErrorKind::Parameter
        );
        assert_eq!(
            Error::LogoTooLarge {
                width: 100_000,
                height: 100_000
            }
            .kind(),
            ErrorKind::Parameter
        );
        let parse = serde_json::from_str::<u32>("nope").unwrap_err();
        assert_eq!(
            Error::SettingsParse {
                path: PathBuf::from("settings.json"),
                source: parse,
            }
            .kind(),
            ErrorKind::Persistence
        );
        assert_eq!(
            Error::UnsupportedFormat("gif".into()).kind(),
            ErrorKind::Output
        );
    }
}
