//! Source loading – reads the job's photo from disk and decodes it into an
//! RGB8 buffer, applying EXIF orientation first when asked to.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};

use crate::error::{ComposeError, Result};

/// Decoded source photo. Read-only for the rest of the job.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub pixels: RgbImage,
}

impl SourceImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Decode `bytes` that were read from `path`.
    ///
    /// With `auto_orient` the EXIF orientation tag (if any) is applied so the
    /// aspect decision sees the photo the way the camera meant it.
    pub fn decode(path: &Path, bytes: &[u8], auto_orient: bool) -> Result<Self> {
        if bytes.is_empty() {
            return Err(ComposeError::image_load(path, "file is empty"));
        }

        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ComposeError::image_load(path, e))?;
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| ComposeError::image_load(path, e))?;
        let orientation = if auto_orient {
            decoder.orientation().ok()
        } else {
            None
        };

        let mut image =
            DynamicImage::from_decoder(decoder).map_err(|e| ComposeError::image_load(path, e))?;
        if let Some(orientation) = orientation {
            image.apply_orientation(orientation);
        }

        if image.width() == 0 || image.height() == 0 {
            return Err(ComposeError::image_load(path, "image has no pixels"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            pixels: image.into_rgb8(),
        })
    }
}

/// Read the raw source bytes. Failing here means there is nothing to print at
/// all, so the error is fatal rather than a fallback.
pub fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ComposeError::fs(path, e))
}
