//! Colour-profile tagging and JPEG encoding.
//!
//! Tagging never touches pixel values: it only decides which ICC profile and
//! pixel density end up in the file's metadata segments.

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::config::ProfileConfig;
use crate::error::{ComposeError, Result};
use crate::layout_spec::PRINT_DPI;

/// Encode quality for every print artifact.
pub const JPEG_QUALITY: u8 = 95;

/// Minimum size of an ICC profile: 128-byte header plus the tag count.
const ICC_MIN_LEN: usize = 132;

/// Largest ICC profile a JPEG can carry: 255 APP2 chunks of 65519 bytes.
pub const JPEG_ICC_MAX_LEN: usize = 255 * 65_519;

/// A named colour profile, optionally backed by ICC bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorProfile {
    pub name: String,
    icc: Option<Vec<u8>>,
}

impl ColorProfile {
    /// A profile that embeds nothing; viewers and printers assume sRGB.
    pub fn untagged(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icc: None,
        }
    }

    /// Wrap raw ICC bytes after checking the header.
    pub fn from_icc(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        if let Err(reason) = validate_icc(&bytes) {
            return Err(ComposeError::Profile { name, reason });
        }
        Ok(Self {
            name,
            icc: Some(bytes),
        })
    }

    /// Resolve the configured profile, reading the ICC file if one is set.
    pub fn load(config: &ProfileConfig) -> Result<Self> {
        match &config.icc_path {
            None => Ok(Self::untagged(&config.name)),
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| ComposeError::Profile {
                    name: config.name.clone(),
                    reason: format!("cannot read {}: {e}", path.display()),
                })?;
                log::debug!(
                    "Loaded ICC profile '{}' ({} bytes) from {}",
                    config.name,
                    bytes.len(),
                    path.display()
                );
                Self::from_icc(&config.name, bytes)
            }
        }
    }

    pub fn icc(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }
}

fn validate_icc(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < ICC_MIN_LEN {
        return Err(format!("{} bytes is too short for an ICC header", bytes.len()));
    }
    if &bytes[36..40] != b"acsp" {
        return Err("missing 'acsp' signature".to_string());
    }
    let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if declared > bytes.len() {
        return Err(format!(
            "header declares {declared} bytes but file has {}",
            bytes.len()
        ));
    }
    Ok(())
}

/// The final page plus the metadata it will carry.
#[derive(Debug)]
pub struct TaggedRaster<'a> {
    pub image: RgbImage,
    pub profile: &'a ColorProfile,
    pub dpi: u16,
}

/// Attach `profile` and the print density to `image`.
pub fn tag(image: RgbImage, profile: &ColorProfile) -> TaggedRaster<'_> {
    TaggedRaster {
        image,
        profile,
        dpi: PRINT_DPI,
    }
}

/// Encode a tagged raster as JPEG at [`JPEG_QUALITY`].
///
/// A profile the encoder refuses is a [`ComposeError::Profile`]; any other
/// failure is a fatal [`ComposeError::Encoding`].
pub fn encode_jpeg(raster: &TaggedRaster<'_>) -> Result<Vec<u8>> {
    let (width, height) = raster.image.dimensions();
    let mut bytes = Vec::new();

    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(raster.dpi));
    if let Some(icc) = raster.profile.icc() {
        if icc.len() > JPEG_ICC_MAX_LEN {
            return Err(ComposeError::Profile {
                name: raster.profile.name.clone(),
                reason: format!(
                    "{} bytes exceeds the {JPEG_ICC_MAX_LEN}-byte JPEG limit",
                    icc.len()
                ),
            });
        }
        encoder
            .set_icc_profile(icc.to_vec())
            .map_err(|e| ComposeError::Profile {
                name: raster.profile.name.clone(),
                reason: e.to_string(),
            })?;
    }
    encoder
        .write_image(raster.image.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ComposeError::Encoding(e.to_string()))?;

    Ok(bytes)
}
