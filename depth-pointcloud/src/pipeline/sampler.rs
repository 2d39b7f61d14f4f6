//! Point budget sampling
//!
//! Picks at most `max_points` depth pixels with a fixed raster stride. The
//! choice depends only on image dimensions and the budget, so identical
//! inputs always visit identical pixels.

use std::iter::FusedIterator;

/// Depth-image pixel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub col: u32,
    pub row: u32,
}

/// Uniform raster-stride sampler over a `width` x `height` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSampler {
    width: u32,
    height: u32,
    stride: usize,
    count: usize,
}

impl BudgetSampler {
    pub fn new(width: u32, height: u32, max_points: usize) -> Self {
        let total = width as usize * height as usize;
        let (stride, count) = if total == 0 || max_points == 0 {
            (1, 0)
        } else if total <= max_points {
            (1, total)
        } else {
            let stride = total.div_ceil(max_points);
            // ceil(total / stride) <= max_points already; the min guards the last step.
            (stride, total.div_ceil(stride).min(max_points))
        };
        Self {
            width,
            height,
            stride,
            count,
        }
    }

    pub fn total_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raster distance between consecutive samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every pixel is visited.
    pub fn is_exhaustive(&self) -> bool {
        self.count == self.total_pixels()
    }

    /// Pixel of the `index`-th sample.
    #[inline]
    pub fn coord_at(&self, index: usize) -> Option<PixelCoord> {
        if index >= self.count {
            return None;
        }
        let raster = index * self.stride;
        let width = self.width as usize;
        Some(PixelCoord {
            col: (raster % width) as u32,
            row: (raster / width) as u32,
        })
    }

    pub fn iter(&self) -> Samples {
        Samples {
            sampler: *self,
            next: 0,
        }
    }
}

impl IntoIterator for &BudgetSampler {
    type Item = PixelCoord;
    type IntoIter = Samples;

    fn into_iter(self) -> Samples {
        self.iter()
    }
}

/// Lazy sequence of sampled pixels in raster order.
#[derive(Debug, Clone)]
pub struct Samples {
    sampler: BudgetSampler,
    next: usize,
}

impl Iterator for Samples {
    type Item = PixelCoord;

    fn next(&mut self) -> Option<PixelCoord> {
        let coord = self.sampler.coord_at(self.next)?;
        self.next += 1;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.sampler.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Samples {}

impl FusedIterator for Samples {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_budget_visits_every_pixel() {
        let sampler = BudgetSampler::new(4, 4, 16);
        assert_eq!(sampler.stride(), 1);
        assert_eq!(sampler.len(), 16);
        assert!(sampler.is_exhaustive());

        let coords: Vec<_> = sampler.iter().collect();
        assert_eq!(coords.len(), 16);
        assert_eq!(coords[0], PixelCoord { col: 0, row: 0 });
        assert_eq!(coords[5], PixelCoord { col: 1, row: 1 });
        assert_eq!(coords[15], PixelCoord { col: 3, row: 3 });
    }

    #[test]
    fn test_hundred_thousand_pixels_at_default_budget() {
        // 100_000 pixels, ceil(100_000 / 15_000) = 7
        let sampler = BudgetSampler::new(400, 250, 15000);
        assert_eq!(sampler.stride(), 7);
        assert_eq!(sampler.len(), 14286);
        assert_eq!(sampler.iter().count(), 14286);
        assert!(sampler.len() <= 15000);

        let last = sampler.coord_at(14285).unwrap();
        assert_eq!(last.row as usize * 400 + last.col as usize, 14285 * 7);
        assert_eq!(sampler.coord_at(14286), None);
    }

    #[test]
    fn test_never_exceeds_budget() {
        for (w, h) in [(1, 1), (7, 3), (160, 90), (256, 192), (640, 480), (1000, 1)] {
            for max in [1, 2, 3, 10, 99, 1000, 15000, 307_199] {
                let sampler = BudgetSampler::new(w, h, max);
                assert!(sampler.len() <= max, "{}x{} max {}", w, h, max);
                assert_eq!(sampler.iter().len(), sampler.len());
                assert_eq!(sampler.iter().count(), sampler.len());
                for coord in &sampler {
                    assert!(coord.col < w && coord.row < h);
                }
            }
        }
    }

    #[test]
    fn test_zero_budget_or_empty_image() {
        assert!(BudgetSampler::new(640, 480, 0).is_empty());
        assert!(BudgetSampler::new(0, 480, 100).is_empty());
        assert_eq!(BudgetSampler::new(0, 0, 100).iter().next(), None);
    }

    #[test]
    fn test_deterministic() {
        let a: Vec<_> = BudgetSampler::new(320, 240, 5000).iter().collect();
        let b: Vec<_> = BudgetSampler::new(320, 240, 5000).iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_iterator_matches_random_access() {
        let sampler = BudgetSampler::new(33, 17, 50);
        for (i, coord) in sampler.iter().enumerate() {
            assert_eq!(sampler.coord_at(i), Some(coord));
        }
    }
}
