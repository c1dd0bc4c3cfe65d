//! Image codec: decode, partition into a tile grid, pack tiles into a zip.
//!
//! Everything here is stateless and single-threaded; the file manager calls
//! it while holding the owning session's lock.

mod grid;
mod pack;

use std::path::Path;

use image::{DynamicImage, ImageError, ImageFormat, ImageReader};
use tracing::{debug, error};

use crate::error::CodecError;

pub use grid::{cut_image, TileGrid, MIN_TILE_SIZE};
pub use pack::{pack_images, tile_name, JPEG_QUALITY};

/// Open and decode the image at `path`.
///
/// Only JPEG and PNG sources are accepted.
pub fn open_image(path: &Path) -> Result<(DynamicImage, ImageFormat), CodecError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| {
            error!("error opening file {}: {}", path.display(), e);
            CodecError::Io(e)
        })?;

    let format = match reader.format() {
        Some(f @ (ImageFormat::Jpeg | ImageFormat::Png)) => f,
        Some(other) => return Err(CodecError::UnsupportedFormat(format!("{:?}", other))),
        None => return Err(CodecError::UnsupportedFormat("unknown".to_string())),
    };

    let img = reader.decode().map_err(|e| {
        error!("error decoding {}: {}", path.display(), e);
        match e {
            ImageError::IoError(io) => CodecError::Io(io),
            other => CodecError::UnsupportedFormat(other.to_string()),
        }
    })?;

    debug!("decoded format is {:?} ({}x{})", format, img.width(), img.height());
    Ok((img, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_open_png_and_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let img = RgbImage::from_pixel(40, 30, image::Rgb([200, 100, 50]));

        let png = dir.path().join("a.png");
        img.save(&png).unwrap();
        let (decoded, format) = open_image(&png).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!((decoded.width(), decoded.height()), (40, 30));

        let jpeg = dir.path().join("a.jpg");
        img.save(&jpeg).unwrap();
        let (_, format) = open_image(&jpeg).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
    }

    #[test]
    fn test_open_rejects_non_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = open_image(&path).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_image(&dir.path().join("missing.png")).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
