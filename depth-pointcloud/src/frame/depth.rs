//! Borrowed depth and confidence grids.

use crate::error::{PointCloudError, Result};

/// Row-major view over a caller-owned 2D buffer.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a, T> {
    width: u32,
    height: u32,
    /// Elements between the starts of consecutive rows
    row_stride: usize,
    data: &'a [T],
}

impl<'a, T: Copy> GridView<'a, T> {
    /// Tightly packed grid (`row_stride == width`).
    pub fn new(name: &'static str, width: u32, height: u32, data: &'a [T]) -> Result<Self> {
        Self::with_row_stride(name, width, height, width as usize, data)
    }

    /// Grid whose rows are padded to `row_stride` elements.
    pub fn with_row_stride(
        name: &'static str,
        width: u32,
        height: u32,
        row_stride: usize,
        data: &'a [T],
    ) -> Result<Self> {
        if row_stride < width as usize {
            return Err(PointCloudError::RowStride {
                name,
                width,
                row_stride,
            });
        }
        // The last row does not need its padding.
        let expected = if width == 0 || height == 0 {
            0
        } else {
            row_stride * (height as usize - 1) + width as usize
        };
        if data.len() < expected {
            return Err(PointCloudError::BufferSize {
                name,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            row_stride,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Value at column `col`, row `row`.
    #[inline]
    pub fn get(&self, col: u32, row: u32) -> Option<T> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data
            .get(row as usize * self.row_stride + col as usize)
            .copied()
    }
}

/// How raw depth values are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepthEncoding {
    /// Whole 16 bits are millimeters.
    #[default]
    Millimeters,
    /// Android `DEPTH16`: low 13 bits millimeters, high 3 bits a confidence code.
    Depth16,
}

impl DepthEncoding {
    const DEPTH16_RANGE_MASK: u16 = 0x1FFF;

    #[inline]
    pub fn millimeters(self, raw: u16) -> u16 {
        match self {
            DepthEncoding::Millimeters => raw,
            DepthEncoding::Depth16 => raw & Self::DEPTH16_RANGE_MASK,
        }
    }
}

/// Depth map from the acquisition side. Zero means "no reading".
#[derive(Debug, Clone, Copy)]
pub struct DepthImage<'a> {
    grid: GridView<'a, u16>,
    encoding: DepthEncoding,
}

impl<'a> DepthImage<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u16]) -> Result<Self> {
        Ok(Self {
            grid: GridView::new("depth", width, height, data)?,
            encoding: DepthEncoding::Millimeters,
        })
    }

    pub fn with_row_stride(width: u32, height: u32, row_stride: usize, data: &'a [u16]) -> Result<Self> {
        Ok(Self {
            grid: GridView::with_row_stride("depth", width, height, row_stride, data)?,
            encoding: DepthEncoding::Millimeters,
        })
    }

    pub fn with_encoding(mut self, encoding: DepthEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> DepthEncoding {
        self.encoding
    }

    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.grid.dimensions()
    }

    pub fn pixel_count(&self) -> usize {
        self.grid.pixel_count()
    }

    /// Decoded depth in millimeters.
    #[inline]
    pub fn depth_mm(&self, col: u32, row: u32) -> Option<f32> {
        self.grid
            .get(col, row)
            .map(|raw| self.encoding.millimeters(raw) as f32)
    }
}

/// Per-pixel confidence matching the depth image.
#[derive(Debug, Clone, Copy)]
pub enum ConfidenceImage<'a> {
    /// Already in [0, 1].
    Normalized(GridView<'a, f32>),
    /// 0-255 codes, 255 is full confidence.
    Raw8(GridView<'a, u8>),
}

impl<'a> ConfidenceImage<'a> {
    pub fn normalized(width: u32, height: u32, data: &'a [f32]) -> Result<Self> {
        Ok(Self::Normalized(GridView::new("confidence", width, height, data)?))
    }

    pub fn raw8(width: u32, height: u32, data: &'a [u8]) -> Result<Self> {
        Ok(Self::Raw8(GridView::new("confidence", width, height, data)?))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ConfidenceImage::Normalized(grid) => grid.dimensions(),
            ConfidenceImage::Raw8(grid) => grid.dimensions(),
        }
    }

    #[inline]
    pub fn confidence(&self, col: u32, row: u32) -> Option<f32> {
        match self {
            ConfidenceImage::Normalized(grid) => grid.get(col, row),
            ConfidenceImage::Raw8(grid) => grid.get(col, row).map(|c| c as f32 / 255.0),
        }
    }
}
