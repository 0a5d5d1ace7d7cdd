//! Logo compositing.
//!
//! A logo is resized relative to the base image width, its alpha channel is
//! optionally scaled down, and it is drawn over a copy of the base image with
//! standard "over" alpha compositing, either once at a named anchor or tiled
//! across the whole canvas. The result is flattened to opaque RGB.

use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Distance in pixels between an anchored logo and the nearest image edges.
pub const ANCHOR_MARGIN: i64 = 10;

/// Gap in pixels between neighbouring tiles in repeat mode.
pub const TILE_PADDING: u32 = 50;

/// Largest scaled logo accepted, in pixels (256 MiB of RGBA).
pub const MAX_LOGO_PIXELS: u64 = 64 * 1024 * 1024;

/// Named anchor for a single, non-tiled logo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Position {
    /// 10px from the top and left edges.
    TopLeft,
    /// 10px from the top and right edges.
    TopRight,
    /// 10px from the bottom and left edges.
    BottomLeft,
    /// 10px from the bottom and right edges.
    #[default]
    BottomRight,
    /// Centered on both axes.
    Center,
}

impl Position {
    /// All positions, in menu order.
    pub const ALL: [Position; 5] = [
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
        Position::Center,
    ];

    /// Canonical kebab-case name, e.g. `"top-left"`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
            Position::Center => "center",
        }
    }

    /// Parse a position name, falling back to [`Position::BottomRight`] for
    /// anything unrecognized.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Position::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown position {s:?}")))
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Position::from_name(&name))
    }
}

/// Where and how the logo is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// Anchor used when `repeat` is false.
    pub position: Position,
    /// Logo width as a percentage of the base image width.
    pub scale_percent: f64,
    /// Logo opacity in `[0, 100]`.
    pub opacity_percent: f64,
    /// Tile the logo across the whole image, ignoring `position`.
    pub repeat: bool,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Position::BottomRight,
            scale_percent: 20.0,
            opacity_percent: 100.0,
            repeat: false,
        }
    }
}

impl Placement {
    /// Check that scale and opacity are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the scale is not a positive
    /// finite number or the opacity is outside `[0, 100]`.
    pub fn validate(&self) -> Result<()> {
        if !self.scale_percent.is_finite() || self.scale_percent <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "scale must be a positive percentage, got {}",
                self.scale_percent
            )));
        }
        if !(0.0..=100.0).contains(&self.opacity_percent) {
            return Err(Error::InvalidParameter(format!(
                "opacity must be within 0..=100, got {}",
                self.opacity_percent
            )));
        }
        Ok(())
    }
}

/// Compute the resized logo dimensions for a base image of width `base_width`.
///
/// The width is `floor(base_width * scale_percent / 100)`; the height keeps
/// the aspect ratio of the original logo, `floor(width * logo_h / logo_w)`.
///
/// # Errors
///
/// Returns [`Error::DegenerateLogo`] if either resulting dimension is zero
/// and [`Error::LogoTooLarge`] if the logo would exceed [`MAX_LOGO_PIXELS`].
pub fn scaled_logo_size(
    base_width: u32,
    logo_width: u32,
    logo_height: u32,
    scale_percent: f64,
) -> Result<(u32, u32)> {
    let raw = (f64::from(base_width) * scale_percent / 100.0).floor();
    if !raw.is_finite() || raw < 1.0 || logo_width == 0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let width = if raw.is_finite() && raw > 0.0 { raw as u32 } else { 0 };
        return Err(Error::DegenerateLogo { width, height: 0 });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let width = raw.min(f64::from(u32::MAX)) as u32;

    let height = u64::from(width) * u64::from(logo_height) / u64::from(logo_width);
    let height = u32::try_from(height).unwrap_or(u32::MAX);
    if height == 0 {
        return Err(Error::DegenerateLogo { width, height });
    }
    if u64::from(width) * u64::from(height) > MAX_LOGO_PIXELS {
        return Err(Error::LogoTooLarge { width, height });
    }
    Ok((width, height))
}

/// Scale the alpha channel of `logo` by `opacity_percent / 100`.
///
/// Colour channels are untouched. Nothing happens at 100% or above.
pub fn apply_opacity(logo: &mut RgbaImage, opacity_percent: f64) {
    if opacity_percent >= 100.0 {
        return;
    }
    #[allow(clippy::cast_possible_truncation)]
    let factor = (opacity_percent / 100.0).max(0.0) as f32;
    for px in logo.pixels_mut() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            px[3] = (f32::from(px[3]) * factor).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Resize `logo` for a base image of width `base_width` and apply the
/// placement's opacity.
///
/// # Errors
///
/// Returns [`Error::DegenerateLogo`] if the scaled logo would be empty and
/// [`Error::LogoTooLarge`] if it would be too big to allocate.
pub fn prepare_logo(logo: &RgbaImage, base_width: u32, placement: &Placement) -> Result<RgbaImage> {
    let (width, height) = scaled_logo_size(
        base_width,
        logo.width(),
        logo.height(),
        placement.scale_percent,
    )?;

    let mut scaled = if (width, height) == logo.dimensions() {
        logo.clone()
    } else {
        imageops::resize(logo, width, height, FilterType::Lanczos3)
    };
    apply_opacity(&mut scaled, placement.opacity_percent);
    Ok(scaled)
}

/// Top-left corner of an anchored logo.
///
/// Offsets are negative when the logo is larger than the base image; the
/// overhanging part is clipped when drawn.
#[must_use]
pub fn anchor_offset(position: Position, base: (u32, u32), logo: (u32, u32)) -> (i64, i64) {
    let (w, h) = (i64::from(base.0), i64::from(base.1));
    let (lw, lh) = (i64::from(logo.0), i64::from(logo.1));
    let right = w - lw - ANCHOR_MARGIN;
    let bottom = h - lh - ANCHOR_MARGIN;

    match position {
        Position::TopLeft => (ANCHOR_MARGIN, ANCHOR_MARGIN),
        Position::TopRight => (right, ANCHOR_MARGIN),
        Position::BottomLeft => (ANCHOR_MARGIN, bottom),
        Position::BottomRight => (right, bottom),
        Position::Center => ((w - lw).div_euclid(2), (h - lh).div_euclid(2)),
    }
}

/// Origins of every tile in repeat mode, row by row.
///
/// The grid starts at `(0, 0)` with a stride of the logo size plus
/// [`TILE_PADDING`] and stops once an origin leaves the base image.
#[must_use]
pub fn tile_origins(base: (u32, u32), logo: (u32, u32)) -> Vec<(i64, i64)> {
    let step_x = logo.0.saturating_add(TILE_PADDING) as usize;
    let step_y = logo.1.saturating_add(TILE_PADDING) as usize;

    (0..base.1)
        .step_by(step_y)
        .flat_map(|y| {
            (0..base.0)
                .step_by(step_x)
                .map(move |x| (i64::from(x), i64::from(y)))
        })
        .collect()
}

/// Composite `logo` over `base` and flatten the result to opaque RGB.
///
/// `base` is not modified. Any transparency in the base image is discarded
/// in the output.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] for an invalid placement,
/// [`Error::DegenerateLogo`] if the scaled logo would be empty and
/// [`Error::LogoTooLarge`] if it would be too big to allocate.
pub fn composite(base: &RgbaImage, logo: &RgbaImage, placement: &Placement) -> Result<RgbImage> {
    placement.validate()?;
    let logo = prepare_logo(logo, base.width(), placement)?;
    let mut canvas = base.clone();

    if placement.repeat {
        let origins = tile_origins(canvas.dimensions(), logo.dimensions());
        tracing::debug!(
            logo_width = logo.width(),
            logo_height = logo.height(),
            tiles = origins.len(),
            "tiling logo"
        );
        for (x, y) in origins {
            imageops::overlay(&mut canvas, &logo, x, y);
        }
    } else {
        let (x, y) = anchor_offset(placement.position, canvas.dimensions(), logo.dimensions());
        tracing::debug!(
            logo_width = logo.width(),
            logo_height = logo.height(),
            x,
            y,
            position = %placement.position,
            "placing logo"
        );
        imageops::overlay(&mut canvas, &logo, x, y);
    }

    Ok(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn scaled_size_uses_floor_and_original_aspect() {
        assert_eq!(scaled_logo_size(1000, 400, 200, 20.0).unwrap(), (200, 100));
        assert_eq!(scaled_logo_size(1000, 300, 100, 25.5).unwrap(), (255, 85));
        // 999 * 10 / 100 = 99.9 -> 99; 99 * 7 / 3 = 231
        assert_eq!(scaled_logo_size(999, 3, 7, 10.0).unwrap(), (99, 231));
    }

    #[test]
    fn scaled_size_rejects_degenerate_results() {
        let err = scaled_logo_size(100, 50, 50, 0.5).unwrap_err();
        assert!(matches!(err, Error::DegenerateLogo { width: 0, .. }));

        // Very wide logo: height rounds down to zero.
        let err = scaled_logo_size(100, 1000, 1, 10.0).unwrap_err();
        assert!(matches!(err, Error::DegenerateLogo { width: 10, height: 0 }));
    }

    #[test]
    fn anchor_table_for_reference_dimensions() {
        let base = (1000, 800);
        let logo = (200, 100);
        assert_eq!(anchor_offset(Position::TopLeft, base, logo), (10, 10));
        assert_eq!(anchor_offset(Position::TopRight, base, logo), (790, 10));
        assert_eq!(anchor_offset(Position::BottomLeft, base, logo), (10, 690));
        assert_eq!(anchor_offset(Position::BottomRight, base, logo), (790, 690));
        assert_eq!(anchor_offset(Position::Center, base, logo), (400, 350));
    }

    #[test]
    fn center_uses_floor_division() {
        assert_eq!(anchor_offset(Position::Center, (1001, 801), (200, 100)), (400, 350));
        assert_eq!(anchor_offset(Position::Center, (100, 100), (201, 100)), (-51, 0));
    }

    #[test]
    fn unknown_position_falls_back_to_bottom_right() {
        assert_eq!(Position::from_name("middle"), Position::BottomRight);
        assert_eq!(Position::from_name(""), Position::BottomRight);
        assert_eq!(Position::from_name("center"), Position::Center);
        assert!("middle".parse::<Position>().is_err());
        for p in Position::ALL {
            assert_eq!(p.name().parse::<Position>().unwrap(), p);
        }
    }

    #[test]
    fn tile_grid_matches_stride() {
        let origins = tile_origins((1000, 800), (200, 100));
        let xs: Vec<i64> = origins.iter().filter(|o| o.1 == 0).map(|o| o.0).collect();
        let ys: Vec<i64> = origins.iter().filter(|o| o.0 == 0).map(|o| o.1).collect();
        assert_eq!(xs, vec![0, 250, 500, 750]);
        assert_eq!(ys, vec![0, 150, 300, 450, 600, 750]);
        assert_eq!(origins.len(), 4 * 6);
        assert!(origins.iter().all(|&(x, y)| x < 1000 && y < 800));
    }

    #[test]
    fn opacity_scales_alpha_only() {
        let mut logo = solid(2, 2, [10, 20, 30, 255]);
        apply_opacity(&mut logo, 50.0);
        assert_eq!(*logo.get_pixel(0, 0), Rgba([10, 20, 30, 127]));

        let mut untouched = solid(2, 2, [10, 20, 30, 200]);
        apply_opacity(&mut untouched, 100.0);
        assert_eq!(*untouched.get_pixel(1, 1), Rgba([10, 20, 30, 200]));
    }

    #[test]
    fn zero_opacity_leaves_base_unchanged() {
        let base = solid(100, 80, [40, 90, 160, 255]);
        let logo = solid(20, 10, [255, 0, 0, 255]);
        let placement = Placement {
            opacity_percent: 0.0,
            position: Position::Center,
            ..Placement::default()
        };
        let out = composite(&base, &logo, &placement).unwrap();
        assert_eq!(out, DynamicImage::ImageRgba8(base).to_rgb8());
    }

    #[test]
    fn full_opacity_matches_unmodified_alpha() {
        let base = solid(100, 80, [40, 90, 160, 255]);
        // Already 20% of the base width, so no resampling happens.
        let logo = solid(20, 10, [250, 10, 10, 128]);
        let placement = Placement {
            position: Position::TopLeft,
            ..Placement::default()
        };
        let out = composite(&base, &logo, &placement).unwrap();

        let mut expected = base.clone();
        imageops::overlay(&mut expected, &logo, 10, 10);
        assert_eq!(out, DynamicImage::ImageRgba8(expected).to_rgb8());

        // Half-transparent red over opaque blue-ish base: roughly the mean.
        let px = out.get_pixel(15, 15);
        for (got, want) in px.0.iter().zip([145u8, 50, 85]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", px.0);
        }
        assert_eq!(out.get_pixel(5, 5).0, [40, 90, 160]);
    }

    #[test]
    fn opaque_logo_lands_at_anchor() {
        let base = solid(1000, 800, [0, 0, 0, 255]);
        let logo = solid(200, 100, [255, 255, 255, 255]);
        let placement = Placement {
            position: Position::TopRight,
            ..Placement::default()
        };
        let out = composite(&base, &logo, &placement).unwrap();
        assert_eq!(out.get_pixel(790, 10).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(989, 109).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(789, 10).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(790, 9).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(990, 10).0, [0, 0, 0]);
    }

    #[test]
    fn repeat_ignores_position_and_clips_partial_tiles() {
        let base = solid(1000, 800, [0, 0, 0, 255]);
        let logo = solid(200, 100, [255, 255, 255, 255]);
        let placement = Placement {
            position: Position::Center,
            repeat: true,
            ..Placement::default()
        };
        let out = composite(&base, &logo, &placement).unwrap();
        assert_eq!(out.dimensions(), (1000, 800));
        assert_eq!(out.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(200, 0).0, [0, 0, 0]);
        assert_eq!(out.get_pixel(250, 150).0, [255, 255, 255]);
        // Tile at (750, 750) is clipped at the bottom edge.
        assert_eq!(out.get_pixel(949, 799).0, [255, 255, 255]);
        assert_eq!(out.get_pixel(960, 799).0, [0, 0, 0]);
    }

    #[test]
    fn transparent_base_is_flattened() {
        let base = solid(50, 50, [1, 2, 3, 0]);
        let logo = solid(10, 10, [9, 9, 9, 255]);
        let out = composite(&base, &logo, &Placement::default()).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn oversized_logo_is_clipped() {
        let base = solid(100, 100, [0, 0, 0, 255]);
        let logo = solid(150, 150, [200, 200, 200, 255]);
        let placement = Placement {
            scale_percent: 150.0,
            position: Position::TopRight,
            ..Placement::default()
        };
        // x = 100 - 150 - 10 = -60
        let out = composite(&base, &logo, &placement).unwrap();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(0, 50).0, [200, 200, 200]);
        assert_eq!(out.get_pixel(0, 5).0, [0, 0, 0]);
    }

    #[test]
    fn invalid_placement_is_rejected() {
        let base = solid(10, 10, [0, 0, 0, 255]);
        let logo = solid(10, 10, [0, 0, 0, 255]);
        for placement in [
            Placement { scale_percent: 0.0, ..Placement::default() },
            Placement { scale_percent: f64::NAN, ..Placement::default() },
            Placement { opacity_percent: 120.0, ..Placement::default() },
            Placement { opacity_percent: -1.0, ..Placement::default() },
        ] {
            let err = composite(&base, &logo, &placement).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter(_)), "{placement:?}");
        }
    }

    #[test]
    fn translucent_logo_over_transparent_base_keeps_logo_colour() {
        let base = solid(50, 50, [0, 0, 0, 0]);
        let logo = solid(10, 10, [100, 150, 200, 128]);
        let placement = Placement {
            position: Position::TopLeft,
            ..Placement::default()
        };
        let out = composite(&base, &logo, &placement).unwrap();
        let px = out.get_pixel(12, 12);
        for (got, want) in px.0.iter().zip([100u8, 150, 200]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", px.0);
        }
        assert_eq!(out.get_pixel(5, 5).0, [0, 0, 0]);
    }

    #[test]
    fn huge_scale_is_rejected_before_allocating() {
        let err = scaled_logo_size(100, 10, 10, 100_000.0).unwrap_err();
        assert!(matches!(err, Error::LogoTooLarge { width: 100_000, height: 100_000 }));

        let base = solid(100, 100, [0, 0, 0, 255]);
        let logo = solid(10, 10, [255, 255, 255, 255]);
        let placement = Placement {
            scale_percent: 100_000.0,
            ..Placement::default()
        };
        let err = composite(&base, &logo, &placement).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parameter);
    }

    #[test]
    fn tile_grid_survives_maximal_logo_size() {
        assert_eq!(tile_origins((100, 100), (u32::MAX, u32::MAX)), vec![(0, 0)]);
    }
}
