//! Color image access
//!
//! The pipeline reads color through [`ColorSource`] so it can take either an
//! `image` crate buffer or the camera's native YUV_420_888 planes.

use std::ops::Deref;

use image::{ImageBuffer, Pixel, Primitive};

use crate::cloud::ColorRgb;
use crate::error::{PointCloudError, Result};

/// Readable color image.
pub trait ColorSource: Sync {
    /// (width, height) in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Normalized color at (`x`, `y`). Callers stay within [`Self::dimensions`].
    fn rgb_at(&self, x: u32, y: u32) -> ColorRgb;
}

impl<P, C> ColorSource for ImageBuffer<P, C>
where
    P: Pixel + Sync,
    P::Subpixel: Into<f32>,
    C: Deref<Target = [P::Subpixel]> + Sync,
{
    fn dimensions(&self) -> (u32, u32) {
        ImageBuffer::dimensions(self)
    }

    fn rgb_at(&self, x: u32, y: u32) -> ColorRgb {
        let [r, g, b] = self.get_pixel(x, y).to_rgb().0;
        let max: f32 = <P::Subpixel as Primitive>::DEFAULT_MAX_VALUE.into();
        let normalize = |channel: P::Subpixel| {
            let value: f32 = channel.into();
            value / max
        };
        ColorRgb::new(normalize(r), normalize(g), normalize(b))
    }
}

/// One plane of a YUV_420_888 image.
#[derive(Debug, Clone, Copy)]
pub struct YuvPlane<'a> {
    pub data: &'a [u8],
    /// Bytes between rows
    pub row_stride: usize,
    /// Bytes between horizontally adjacent samples
    pub pixel_stride: usize,
}

impl<'a> YuvPlane<'a> {
    pub fn new(data: &'a [u8], row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    fn required_len(&self, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        self.row_stride * (height as usize - 1) + self.pixel_stride * (width as usize - 1) + 1
    }

    #[inline]
    fn sample(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.row_stride + x as usize * self.pixel_stride] as f32
    }
}

/// Borrowed YUV_420_888 camera image (full-resolution luma, 2x2 subsampled chroma).
#[derive(Debug, Clone, Copy)]
pub struct Yuv420Image<'a> {
    width: u32,
    height: u32,
    y: YuvPlane<'a>,
    u: YuvPlane<'a>,
    v: YuvPlane<'a>,
}

impl<'a> Yuv420Image<'a> {
    pub fn new(width: u32, height: u32, y: YuvPlane<'a>, u: YuvPlane<'a>, v: YuvPlane<'a>) -> Result<Self> {
        let chroma_width = width.div_ceil(2);
        let chroma_height = height.div_ceil(2);
        for (name, plane, w, h) in [
            ("luma", &y, width, height),
            ("chroma u", &u, chroma_width, chroma_height),
            ("chroma v", &v, chroma_width, chroma_height),
        ] {
            let expected = plane.required_len(w, h);
            if plane.data.len() < expected {
                return Err(PointCloudError::BufferSize {
                    name,
                    expected,
                    actual: plane.data.len(),
                });
            }
        }
        Ok(Self {
            width,
            height,
            y,
            u,
            v,
        })
    }
}

impl ColorSource for Yuv420Image<'_> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn rgb_at(&self, x: u32, y: u32) -> ColorRgb {
        let luma = self.y.sample(x, y);
        let u = self.u.sample(x / 2, y / 2) - 128.0;
        let v = self.v.sample(x / 2, y / 2) - 128.0;

        // BT.601 full range
        let r = luma + 1.370705 * v;
        let g = luma - 0.698001 * v - 0.337633 * u;
        let b = luma + 1.732446 * u;

        ColorRgb::new(
            r.clamp(0.0, 255.0) / 255.0,
            g.clamp(0.0, 255.0) / 255.0,
            b.clamp(0.0, 255.0) / 255.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    #[test]
    fn test_rgb8_normalization() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(1, 0, Rgb([0, 0, 0]));

        let c = img.rgb_at(0, 0);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 0.2).abs() < 1e-6);
        assert_eq!(img.rgb_at(1, 0), ColorRgb::new(0.0, 0.0, 0.0));
        assert_eq!(ColorSource::dimensions(&img), (2, 1));
    }

    #[test]
    fn test_rgba_ignores_alpha() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([0, 255, 0, 10]));
        assert_eq!(img.rgb_at(0, 0), ColorRgb::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_rgb16_uses_native_range() {
        let img: ImageBuffer<Rgb<u16>, Vec<u16>> = ImageBuffer::from_pixel(1, 1, Rgb([65535, 0, 0]));
        assert_eq!(img.rgb_at(0, 0), ColorRgb::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_yuv_gray_and_red() {
        // 2x2 image, one chroma sample.
        let y = [128u8; 4];
        let neutral = [128u8];
        let img = Yuv420Image::new(
            2,
            2,
            YuvPlane::new(&y, 2, 1),
            YuvPlane::new(&neutral, 1, 1),
            YuvPlane::new(&neutral, 1, 1),
        )
        .unwrap();
        let gray = img.rgb_at(1, 1);
        assert!((gray.r - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(gray.r, gray.g);
        assert_eq!(gray.g, gray.b);

        let red_v = [255u8];
        let img = Yuv420Image::new(
            2,
            2,
            YuvPlane::new(&y, 2, 1),
            YuvPlane::new(&neutral, 1, 1),
            YuvPlane::new(&red_v, 1, 1),
        )
        .unwrap();
        let red = img.rgb_at(0, 0);
        assert_eq!(red.r, 1.0);
        assert!(red.g < gray.g);
        assert_eq!(red.b, gray.b);
    }

    #[test]
    fn test_yuv_short_plane_rejected() {
        let y = [0u8; 3];
        let c = [0u8; 1];
        let err = Yuv420Image::new(
            2,
            2,
            YuvPlane::new(&y, 2, 1),
            YuvPlane::new(&c, 1, 1),
            YuvPlane::new(&c, 1, 1),
        )
        .unwrap_err();
        assert!(matches!(err, PointCloudError::BufferSize { name: "luma", .. }));
    }
}
