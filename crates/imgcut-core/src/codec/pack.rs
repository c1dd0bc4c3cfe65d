use std::io::{Seek, Write};

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, DynamicImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::grid::TileGrid;
use crate::error::CodecError;

/// JPEG quality used for every tile.
pub const JPEG_QUALITY: u8 = 100;

/// Archive entry name for the tile at 1-based `row`/`col`.
///
/// Indices are zero-padded to the width of the largest index on their axis so
/// that entries sort in grid order.
pub fn tile_name(prefix: &str, row: usize, col: usize, rows: usize, cols: usize) -> String {
    let row_width = count_digits(rows);
    let col_width = count_digits(cols);
    if prefix.is_empty() {
        format!("{row:0row_width$}x{col:0col_width$}.jpeg")
    } else {
        format!("{prefix}_{row:0row_width$}x{col:0col_width$}.jpeg")
    }
}

/// Encode every tile of `grid` as JPEG and write it into `dest`.
pub fn pack_images<W: Write + Seek>(
    dest: &mut ZipWriter<W>,
    grid: &TileGrid,
    prefix: &str,
) -> Result<(), CodecError> {
    let rows = grid.row_count();
    let cols = grid.col_count();

    for (y, row) in grid.rows().iter().enumerate() {
        for (x, tile) in row.iter().enumerate() {
            dest.start_file(
                tile_name(prefix, y + 1, x + 1, rows, cols),
                SimpleFileOptions::default(),
            )?;
            encode_jpeg(dest, tile)?;
        }
    }

    Ok(())
}

fn encode_jpeg<W: Write>(dest: &mut W, tile: &DynamicImage) -> Result<(), CodecError> {
    let encoder = JpegEncoder::new_with_quality(dest, JPEG_QUALITY);
    // JPEG has no alpha channel and no 16-bit depth
    let result = match tile.color() {
        ColorType::L8 | ColorType::Rgb8 => tile.write_with_encoder(encoder),
        _ => DynamicImage::ImageRgb8(tile.to_rgb8()).write_with_encoder(encoder),
    };
    result.map_err(|e| CodecError::Encode(e.to_string()))
}

fn count_digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::cut_image;
    use image::{RgbaImage, Rgba};
    use std::io::Cursor;

    #[test]
    fn test_count_digits() {
        assert_eq!(count_digits(0), 1);
        assert_eq!(count_digits(9), 1);
        assert_eq!(count_digits(10), 2);
        assert_eq!(count_digits(12), 2);
        assert_eq!(count_digits(100), 3);
    }

    #[test]
    fn test_tile_name_padding() {
        assert_eq!(tile_name("photo", 1, 1, 4, 4), "photo_1x1.jpeg");
        assert_eq!(tile_name("photo", 3, 7, 12, 9), "photo_03x7.jpeg");
        assert_eq!(tile_name("photo", 11, 10, 11, 10), "photo_11x10.jpeg");
        assert_eq!(tile_name("photo", 2, 5, 2, 150), "photo_2x005.jpeg");
        assert_eq!(tile_name("", 1, 2, 1, 2), "1x2.jpeg");
    }

    #[test]
    fn test_pack_images_writes_every_tile() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 70, Rgba([10, 20, 30, 128])));
        let grid = cut_image(&img, 32, 32).unwrap();

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        pack_images(&mut writer, &grid, "sample").unwrap();
        let buffer = writer.finish().unwrap();

        let mut archive = zip::ZipArchive::new(buffer).unwrap();
        assert_eq!(archive.len(), 12);

        let first = archive.by_index(0).unwrap();
        assert_eq!(first.name(), "sample_1x1.jpeg");
        drop(first);

        assert!(archive.by_name("sample_3x4.jpeg").is_ok());
    }
}
