//! Depth pixel to color pixel lookup.
//!
//! Mapping is proportional per axis with nearest-neighbour rounding. When the
//! depth and color sensors have different aspect ratios the result is skewed
//! rather than letterboxed.

use crate::cloud::ColorRgb;
use crate::frame::ColorSource;

/// Color-image pixel for depth pixel (`col`, `row`).
///
/// `None` when the depth coordinate is outside the depth image or the color
/// image is empty.
#[inline]
pub fn color_coordinate(
    col: u32,
    row: u32,
    depth_dims: (u32, u32),
    color_dims: (u32, u32),
) -> Option<(u32, u32)> {
    let (depth_w, depth_h) = depth_dims;
    let (color_w, color_h) = color_dims;
    if col >= depth_w || row >= depth_h || color_w == 0 || color_h == 0 {
        return None;
    }
    let x = (col as u64 * color_w as u64 / depth_w as u64) as u32;
    let y = (row as u64 * color_h as u64 / depth_h as u64) as u32;
    Some((x.min(color_w - 1), y.min(color_h - 1)))
}

/// Normalized color seen by depth pixel (`col`, `row`).
#[inline]
pub fn match_color<C: ColorSource + ?Sized>(
    col: u32,
    row: u32,
    depth_dims: (u32, u32),
    color: &C,
) -> Option<ColorRgb> {
    let (x, y) = color_coordinate(col, row, depth_dims, color.dimensions())?;
    Some(color.rgb_at(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_same_resolution_is_identity() {
        assert_eq!(color_coordinate(3, 2, (4, 4), (4, 4)), Some((3, 2)));
        assert_eq!(color_coordinate(0, 0, (4, 4), (4, 4)), Some((0, 0)));
    }

    #[test]
    fn test_upscaled_color_image() {
        // 160x120 depth, 640x480 color.
        assert_eq!(color_coordinate(0, 0, (160, 120), (640, 480)), Some((0, 0)));
        assert_eq!(color_coordinate(159, 119, (160, 120), (640, 480)), Some((636, 476)));
        assert_eq!(color_coordinate(80, 60, (160, 120), (640, 480)), Some((320, 240)));
    }

    #[test]
    fn test_aspect_mismatch_scales_per_axis() {
        // 4:3 depth against 16:9 color, no letterboxing.
        assert_eq!(color_coordinate(80, 60, (160, 120), (1280, 720)), Some((640, 360)));
        assert_eq!(color_coordinate(159, 119, (160, 120), (1280, 720)), Some((1272, 714)));
    }

    #[test]
    fn test_downscaled_color_image_stays_in_bounds() {
        for col in 0..7 {
            let (x, y) = color_coordinate(col, 6, (7, 7), (3, 2)).unwrap();
            assert!(x < 3 && y < 2);
        }
    }

    #[test]
    fn test_out_of_bounds() {
        assert_eq!(color_coordinate(4, 0, (4, 4), (8, 8)), None);
        assert_eq!(color_coordinate(0, 4, (4, 4), (8, 8)), None);
        assert_eq!(color_coordinate(0, 0, (4, 4), (0, 8)), None);

        let empty = RgbImage::new(0, 0);
        assert_eq!(match_color(0, 0, (4, 4), &empty), None);
    }

    #[test]
    fn test_match_color_reads_mapped_pixel() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        img.put_pixel(6, 4, Rgb([255, 255, 0]));
        let color = match_color(3, 2, (4, 4), &img).unwrap();
        assert_eq!(color, ColorRgb::new(1.0, 1.0, 0.0));
    }
}
