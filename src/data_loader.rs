use std::path::Path;

use image::{ImageBuffer, ImageReader, Luma};

use crate::error::AlignError;

/// Single channel float raster, intensities in `[0, 1]` for 8/16 bit sources.
pub type GrayImageF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Decodes a raster file into a grayscale float image.
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<GrayImageF32, AlignError>;
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterLoader;

impl ImageLoader for RasterLoader {
    fn load(&self, path: &Path) -> Result<GrayImageF32, AlignError> {
        log::trace!("decoding {}", path.display());
        let img = ImageReader::open(path)
            .map_err(|e| AlignError::unreadable(path, e))?
            .with_guessed_format()
            .map_err(|e| AlignError::unreadable(path, e))?
            .decode()
            .map_err(|e| AlignError::unreadable(path, e))?;
        log::debug!(
            "{}: {}x{} {:?}",
            path.display(),
            img.width(),
            img.height(),
            img.color()
        );
        Ok(img.to_luma32f())
    }
}
