use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::CodecError;

/// Smallest tile edge, in pixels, accepted on either axis.
pub const MIN_TILE_SIZE: u32 = 32;

/// Row-major grid of tiles cut from one source image.
///
/// Edge tiles keep whatever pixels remain, so the last row and column may be
/// narrower than the requested tile size.
#[derive(Debug, Clone)]
pub struct TileGrid {
    rows: Vec<Vec<DynamicImage>>,
}

impl TileGrid {
    pub fn rows(&self) -> &[Vec<DynamicImage>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `img` into tiles of `dx` x `dy` pixels.
///
/// The grid is `ceil(width / dx)` columns by `ceil(height / dy)` rows.
pub fn cut_image(img: &DynamicImage, dx: u32, dy: u32) -> Result<TileGrid, CodecError> {
    if dx < MIN_TILE_SIZE || dy < MIN_TILE_SIZE {
        return Err(CodecError::TileTooSmall {
            dx,
            dy,
            min: MIN_TILE_SIZE,
        });
    }

    let (width, height) = img.dimensions();
    let cols = width.div_ceil(dx);
    let rows = height.div_ceil(dy);
    debug!(
        "cutting {}x{} image into {} rows x {} cols of {}x{}",
        width, height, rows, cols, dx, dy
    );

    let grid = (0..rows)
        .map(|row| {
            let top = row * dy;
            let tile_height = dy.min(height - top);
            (0..cols)
                .map(|col| {
                    let left = col * dx;
                    let tile_width = dx.min(width - left);
                    img.crop_imm(left, top, tile_width, tile_height)
                })
                .collect()
        })
        .collect();

    Ok(TileGrid { rows: grid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
    }

    #[test]
    fn test_grid_dimensions_round_up() {
        let grid = cut_image(&blank(320, 339), 32, 32).unwrap();
        assert_eq!(grid.row_count(), 11);
        assert_eq!(grid.col_count(), 10);
        assert_eq!(grid.len(), 110);

        let grid = cut_image(&blank(320, 339), 100, 100).unwrap();
        assert_eq!(grid.row_count(), 4);
        assert_eq!(grid.col_count(), 4);
        assert_eq!(grid.len(), 16);
    }

    #[test]
    fn test_edge_tiles_are_truncated() {
        let grid = cut_image(&blank(100, 70), 64, 32).unwrap();
        let rows = grid.rows();

        assert_eq!(rows[0][0].dimensions(), (64, 32));
        assert_eq!(rows[0][1].dimensions(), (36, 32));
        assert_eq!(rows[2][0].dimensions(), (64, 6));
        assert_eq!(rows[2][1].dimensions(), (36, 6));
    }

    #[test]
    fn test_exact_fit_has_no_partial_tiles() {
        let grid = cut_image(&blank(64, 64), 32, 32).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(grid
            .rows()
            .iter()
            .flatten()
            .all(|tile| tile.dimensions() == (32, 32)));
    }

    #[test]
    fn test_tile_too_small() {
        let err = cut_image(&blank(1000, 1000), 10, 10).unwrap_err();
        assert!(matches!(err, CodecError::TileTooSmall { dx: 10, dy: 10, min: 32 }));

        let err = cut_image(&blank(1000, 1000), 64, 31).unwrap_err();
        assert!(matches!(err, CodecError::TileTooSmall { .. }));
    }

    #[test]
    fn test_tiles_keep_source_pixels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 32, |x, _| {
            if x < 32 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        }));
        let grid = cut_image(&img, 32, 32).unwrap();
        let right = grid.rows()[0][1].to_rgb8();
        assert_eq!(right.get_pixel(0, 0), &image::Rgb([0, 0, 255]));
    }
}
