//! Sources of midpoint displacement.

use rand::Rng;

/// Supplies the random displacement added to each interpolated midpoint.
pub trait OffsetSource {
    /// Returns an offset in `[0, magnitude)`.
    fn offset(&mut self, magnitude: f64) -> f64;
}

/// Uniform offsets drawn from a pseudo-random generator.
#[derive(Debug, Clone)]
pub struct RandomOffsets<R> {
    rng: R,
}

impl<R: Rng> RandomOffsets<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> OffsetSource for RandomOffsets<R> {
    fn offset(&mut self, magnitude: f64) -> f64 {
        // gen_range panics on an empty range
        if magnitude <= 0.0 {
            return 0.0;
        }
        self.rng.gen_range(0.0..magnitude)
    }
}

/// Always returns the same offset, regardless of magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedOffset(pub f64);

impl OffsetSource for FixedOffset {
    fn offset(&mut self, _magnitude: f64) -> f64 {
        self.0
    }
}
