use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::error::HeightfieldError;
use crate::grid::{level_for_span, span_for_level, Corners, HeightGrid, Heightfield};
use crate::offsets::{OffsetSource, RandomOffsets};

/// Deepest subdivision accepted. Level 12 is a 4097 x 4097 grid.
pub const MAX_LEVEL: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Scales every offset; 1.0 draws from `[0, interval)`.
    pub roughness: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings { roughness: 1.0 }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<(), HeightfieldError> {
        if !self.roughness.is_finite() || self.roughness < 0.0 {
            return Err(HeightfieldError::InvalidRoughness(self.roughness));
        }
        Ok(())
    }
}

/// One border line of the grid, walked by position `t` from its first
/// corner to its last.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    fn cell(self, span: usize, t: usize) -> (usize, usize) {
        let last = span - 1;
        match self {
            Edge::Top => (t, 0),
            Edge::Bottom => (t, last),
            Edge::Left => (0, t),
            Edge::Right => (last, t),
        }
    }
}

/// Diamond-Square heightfield generator.
///
/// Owns the offset source so that a fixed seed (or a [`FixedOffset`]
/// source) reproduces the same terrain.
///
/// [`FixedOffset`]: crate::offsets::FixedOffset
pub struct HeightfieldGenerator<S = RandomOffsets<ChaCha8Rng>> {
    offsets: S,
    settings: GenerationSettings,
}

impl HeightfieldGenerator {
    pub fn new(seed: u64) -> Self {
        Self::new_with_settings(seed, GenerationSettings::default())
    }

    pub fn new_with_settings(seed: u64, settings: GenerationSettings) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(seed);
        HeightfieldGenerator {
            offsets: RandomOffsets::new(rng),
            settings,
        }
    }
}

impl<S: OffsetSource> HeightfieldGenerator<S> {
    pub fn with_offsets(offsets: S) -> Self {
        Self::with_offsets_and_settings(offsets, GenerationSettings::default())
    }

    pub fn with_offsets_and_settings(offsets: S, settings: GenerationSettings) -> Self {
        HeightfieldGenerator { offsets, settings }
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: GenerationSettings) {
        self.settings = settings;
    }

    /// Generates a heightfield at `level`, deriving the span.
    pub fn generate_level(&mut self, level: u32, corners: Corners) -> Result<Heightfield, HeightfieldError> {
        self.generate(span_for_level(level), level, corners)
    }

    /// Generates a `span x span` heightfield from four corner elevations.
    ///
    /// The border lines are seeded first with a 1D midpoint displacement,
    /// then the interior is filled coarse to fine by diamond-square
    /// subdivision. Values that are already set are never revisited.
    pub fn generate(&mut self, span: usize, level: u32, corners: Corners) -> Result<Heightfield, HeightfieldError> {
        validate_request(span, level, &corners)?;
        self.settings.validate()?;

        let mut grid = HeightGrid::new(span);
        grid.set_corners(&corners);

        let mut max_height = corners.max();
        for edge in Edge::ALL {
            max_height = max_height.max(self.seed_edge(&mut grid, edge, level));
        }
        max_height = max_height.max(self.subdivide(&mut grid, level));

        let field = grid.into_heightfield(level, max_height)?;
        info!(
            span,
            level,
            max_height = field.max_height,
            min_height = field.min_height(),
            "heightfield generated"
        );
        Ok(field)
    }

    fn displacement(&mut self, interval: usize) -> f64 {
        self.offsets.offset(interval as f64 * self.settings.roughness)
    }

    /// 1D midpoint displacement along one border line, from `level` down
    /// to 1. Returns the largest value written.
    fn seed_edge(&mut self, grid: &mut HeightGrid, edge: Edge, level: u32) -> f64 {
        if level < 1 {
            return f64::NEG_INFINITY;
        }

        let span = grid.span();
        let interval = 1usize << level;
        let half = interval >> 1;
        let mut local_max = f64::NEG_INFINITY;

        for t in (0..span - 1).step_by(interval) {
            let (mx, my) = edge.cell(span, t + half);
            let (ax, ay) = edge.cell(span, t);
            let (bx, by) = edge.cell(span, t + interval);
            let (Some(a), Some(b)) = (grid.get(ax, ay), grid.get(bx, by)) else {
                continue;
            };
            if let Some(value) = grid.set_if_unset_with(mx, my, || (a + b) / 2.0 + self.displacement(interval)) {
                local_max = local_max.max(value);
            }
        }

        local_max.max(self.seed_edge(grid, edge, level - 1))
    }

    /// Diamond step then square step at `level`, then recurse one level
    /// finer. Returns the largest value written at this level or below.
    fn subdivide(&mut self, grid: &mut HeightGrid, level: u32) -> f64 {
        if level < 1 {
            return f64::NEG_INFINITY;
        }

        let span = grid.span();
        let interval = 1usize << level;
        let half = interval >> 1;
        let origins: Vec<usize> = (0..span).step_by(interval).filter(|&o| o + 1 < span).collect();
        let mut local_max = f64::NEG_INFINITY;

        // Diamond step
        for &y in &origins {
            for &x in &origins {
                let corners = [
                    grid.get(x, y),
                    grid.get(x + interval, y),
                    grid.get(x, y + interval),
                    grid.get(x + interval, y + interval),
                ];
                let Some(values) = corners.into_iter().collect::<Option<Vec<f64>>>() else {
                    continue;
                };
                let value = values.iter().sum::<f64>() / 4.0 + self.displacement(interval);
                grid.set(x + half, y + half, value);
                local_max = local_max.max(value);
            }
        }

        // Square step
        for &y in &origins {
            for &x in &origins {
                let center = (x + half, y + half);
                let midpoints = [
                    ((x + half, y), (x, y), (x + interval, y), y.checked_sub(half).map(|fy| (x + half, fy))),
                    (
                        (x + half, y + interval),
                        (x, y + interval),
                        (x + interval, y + interval),
                        Some((x + half, y + interval + half)),
                    ),
                    ((x, y + half), (x, y), (x, y + interval), x.checked_sub(half).map(|fx| (fx, y + half))),
                    (
                        (x + interval, y + half),
                        (x + interval, y),
                        (x + interval, y + interval),
                        Some((x + interval + half, y + half)),
                    ),
                ];

                for ((mx, my), a, b, far) in midpoints {
                    let Some(average) = midpoint_average(grid, center, a, b, far) else {
                        continue;
                    };
                    if let Some(value) = grid.set_if_unset_with(mx, my, || average + self.displacement(interval)) {
                        local_max = local_max.max(value);
                    }
                }
            }
        }

        debug!(level, interval, local_max, "subdivided level");

        local_max.max(self.subdivide(grid, level - 1))
    }
}

/// Average of the diamond center, the two flanking corners, and the far
/// diamond center when it lies inside the grid. Edge midpoints with no far
/// neighbor divide by 3.
fn midpoint_average(
    grid: &HeightGrid,
    center: (usize, usize),
    a: (usize, usize),
    b: (usize, usize),
    far: Option<(usize, usize)>,
) -> Option<f64> {
    let required = [center, a, b]
        .into_iter()
        .map(|(x, y)| grid.get(x, y))
        .collect::<Option<Vec<f64>>>()?;
    let far_value = far.and_then(|(x, y)| grid.get(x, y));

    let (sum, count) = required
        .into_iter()
        .chain(far_value)
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    Some(sum / count as f64)
}

fn validate_request(span: usize, level: u32, corners: &Corners) -> Result<(), HeightfieldError> {
    if level > MAX_LEVEL {
        return Err(HeightfieldError::LevelTooLarge { level, max: MAX_LEVEL });
    }

    // Level 0 is either the single collapsed cell or the bare four corners.
    if level_for_span(span) != Some(level) {
        return Err(HeightfieldError::SpanMismatch {
            span,
            level,
            expected: span_for_level(level),
        });
    }

    for (corner, value) in corners.named() {
        if !value.is_finite() {
            return Err(HeightfieldError::NonFiniteCorner { corner, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offsets::FixedOffset;

    const EPSILON: f64 = 1e-9;

    fn flat_generator() -> HeightfieldGenerator<FixedOffset> {
        HeightfieldGenerator::with_offsets(FixedOffset(0.0))
    }

    fn true_max(field: &Heightfield) -> f64 {
        field.iter().map(|(_, _, h)| h).fold(f64::NEG_INFINITY, f64::max)
    }

    #[test]
    fn test_every_cell_is_finite() {
        let mut generator = HeightfieldGenerator::new(42);
        for level in 1..=6 {
            let field = generator.generate_level(level, Corners::new(3.0, 8.0, -2.0, 5.0)).unwrap();
            assert_eq!(field.span, span_for_level(level));
            assert_eq!(field.heights.len(), field.span);
            for row in &field.heights {
                assert_eq!(row.len(), field.span);
                assert!(row.iter().all(|h| h.is_finite()));
            }
        }
    }

    #[test]
    fn test_max_height_is_true_maximum() {
        let corners = Corners::new(1.0, 40.0, 2.0, 3.0);
        let mut generator = HeightfieldGenerator::new(7);
        for level in 0..=7 {
            let field = generator.generate_level(level, corners).unwrap();
            let expected = true_max(&field).max(corners.max());
            assert_eq!(field.max_height, expected, "level {}", level);
        }
    }

    #[test]
    fn test_corners_are_preserved() {
        let corners = Corners::new(12.5, -3.0, 0.0, 99.0);
        let mut generator = HeightfieldGenerator::new(1234);
        for level in 1..=7 {
            let field = generator.generate_level(level, corners).unwrap();
            let last = field.span - 1;
            assert_eq!(field.get(0, 0), Some(corners.top_left));
            assert_eq!(field.get(last, 0), Some(corners.top_right));
            assert_eq!(field.get(0, last), Some(corners.bottom_left));
            assert_eq!(field.get(last, last), Some(corners.bottom_right));
        }
    }

    #[test]
    fn test_level_zero_single_cell() {
        let field = HeightfieldGenerator::new(5).generate(1, 0, Corners::uniform(3.5)).unwrap();
        assert_eq!(field.span, 1);
        assert_eq!(field.heights, vec![vec![3.5]]);
        assert_eq!(field.max_height, 3.5);
    }

    #[test]
    fn test_level_zero_mixed_corners_reports_corner_max() {
        let field = HeightfieldGenerator::new(5).generate(1, 0, Corners::new(1.0, 2.0, 3.0, 6.0)).unwrap();
        assert_eq!(field.heights, vec![vec![3.0]]);
        assert_eq!(field.max_height, 6.0);
    }

    #[test]
    fn test_level_zero_four_corner_grid() {
        let corners = Corners::new(1.0, 2.0, 3.0, 4.0);
        let field = HeightfieldGenerator::new(5).generate(2, 0, corners).unwrap();
        assert_eq!(field.heights, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(field.max_height, 4.0);
    }

    #[test]
    fn test_zero_offsets_are_deterministic() {
        let corners = Corners::new(4.0, 9.0, 1.0, 6.0);
        let first = flat_generator().generate_level(5, corners).unwrap();
        let second = flat_generator().generate_level(5, corners).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_same_seed_same_terrain() {
        let corners = Corners::uniform(10.0);
        let first = HeightfieldGenerator::new(2024).generate_level(6, corners).unwrap();
        let second = HeightfieldGenerator::new(2024).generate_level(6, corners).unwrap();
        let other = HeightfieldGenerator::new(2025).generate_level(6, corners).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn test_border_rows_interpolate_linearly() {
        let corners = Corners::new(0.0, 10.0, 0.0, 10.0);
        let field = flat_generator().generate_level(3, corners).unwrap();
        let last = field.span - 1;
        for x in 0..field.span {
            let expected = 10.0 * x as f64 / last as f64;
            assert!((field.heights[0][x] - expected).abs() < EPSILON, "top row x={}", x);
            assert!((field.heights[last][x] - expected).abs() < EPSILON, "bottom row x={}", x);
        }
        for y in 0..field.span {
            assert!(field.heights[y][0].abs() < EPSILON);
            assert!((field.heights[y][last] - 10.0).abs() < EPSILON);
        }
    }

    #[test]
    fn test_refinement_keeps_coarse_values() {
        let corners = Corners::new(2.0, 17.0, -4.0, 8.0);
        for level in 1..5 {
            let coarse = flat_generator().generate_level(level, corners).unwrap();
            let fine = flat_generator().generate_level(level + 1, corners).unwrap();
            for (x, y, h) in coarse.iter() {
                let refined = fine.get(2 * x, 2 * y).unwrap();
                assert!((refined - h).abs() < EPSILON, "level {} cell ({}, {})", level, x, y);
            }
        }
    }

    #[test]
    fn test_flat_zero_scenario() {
        let field = flat_generator().generate(5, 2, Corners::uniform(0.0)).unwrap();
        assert!(field.iter().all(|(_, _, h)| h == 0.0));
        assert_eq!(field.max_height, 0.0);
    }

    #[test]
    fn test_negative_flat_field_max() {
        let field = flat_generator().generate_level(3, Corners::uniform(-5.0)).unwrap();
        assert!(field.iter().all(|(_, _, h)| (h + 5.0).abs() < EPSILON));
        assert_eq!(field.max_height, -5.0);
    }

    #[test]
    fn test_offsets_only_raise_terrain() {
        let field = HeightfieldGenerator::new(31).generate_level(6, Corners::uniform(0.0)).unwrap();
        assert!(field.iter().all(|(_, _, h)| h >= 0.0));
        assert!(field.max_height > 0.0);
    }

    #[test]
    fn test_zero_roughness_matches_zero_offsets() {
        let corners = Corners::new(5.0, 1.0, 9.0, 3.0);
        let settings = GenerationSettings { roughness: 0.0 };
        let smooth = HeightfieldGenerator::new_with_settings(77, settings)
            .generate_level(4, corners)
            .unwrap();
        let flat = flat_generator().generate_level(4, corners).unwrap();
        assert_eq!(smooth, flat);
    }

    #[test]
    fn test_fixed_offset_applied_per_write() {
        // Level 1: each edge midpoint and the center get one offset.
        let field = HeightfieldGenerator::with_offsets(FixedOffset(1.0))
            .generate_level(1, Corners::uniform(0.0))
            .unwrap();
        assert_eq!(field.heights[0][1], 1.0);
        assert_eq!(field.heights[1][0], 1.0);
        assert_eq!(field.heights[1][1], 1.0);
        assert_eq!(field.max_height, 1.0);
    }

    #[test]
    fn test_square_step_values_at_level_two() {
        // Borders: 1.0 at the middle, 1.5 at the quarters. Center: 1.0.
        // Level 1 diamonds average (0, 1, 1, 1) to 1.75; interior square
        // midpoints average (1.75, 1, 1, 1.75) to 2.375.
        let field = HeightfieldGenerator::with_offsets(FixedOffset(1.0))
            .generate_level(2, Corners::uniform(0.0))
            .unwrap();
        let expected = vec![
            vec![0.0, 1.5, 1.0, 1.5, 0.0],
            vec![1.5, 1.75, 2.375, 1.75, 1.5],
            vec![1.0, 2.375, 1.0, 2.375, 1.0],
            vec![1.5, 1.75, 2.375, 1.75, 1.5],
            vec![0.0, 1.5, 1.0, 1.5, 0.0],
        ];
        assert_eq!(field.heights, expected);
        assert_eq!(field.max_height, 2.375);
    }

    #[test]
    fn test_midpoint_average_divides_by_available_terms() {
        let mut grid = HeightGrid::new(3);
        grid.set(0, 0, 3.0);
        grid.set(2, 0, 6.0);
        grid.set(1, 1, 9.0);
        // Top edge midpoint: no far neighbor above the grid.
        let edge = midpoint_average(&grid, (1, 1), (0, 0), (2, 0), None);
        assert_eq!(edge, Some(6.0));

        let mut grid = HeightGrid::new(5);
        grid.set(0, 2, 1.0);
        grid.set(2, 2, 3.0);
        grid.set(1, 1, 4.0);
        grid.set(1, 3, 8.0);
        let interior = midpoint_average(&grid, (1, 3), (0, 2), (2, 2), Some((1, 1)));
        assert_eq!(interior, Some(4.0));

        let out_of_bounds = midpoint_average(&grid, (1, 3), (0, 2), (2, 2), Some((1, 7)));
        assert_eq!(out_of_bounds, Some(4.0));
    }

    #[test]
    fn test_span_mismatch_is_rejected() {
        let result = flat_generator().generate(6, 2, Corners::default());
        assert!(matches!(
            result,
            Err(HeightfieldError::SpanMismatch { span: 6, level: 2, expected: 5 })
        ));
        let result = flat_generator().generate(3, 0, Corners::default());
        assert!(matches!(result, Err(HeightfieldError::SpanMismatch { .. })));
    }

    #[test]
    fn test_level_too_large_is_rejected() {
        let result = flat_generator().generate_level(MAX_LEVEL + 1, Corners::default());
        assert!(matches!(result, Err(HeightfieldError::LevelTooLarge { .. })));
    }

    #[test]
    fn test_non_finite_corner_is_rejected() {
        let result = flat_generator().generate_level(2, Corners::new(0.0, f64::NAN, 0.0, 0.0));
        assert!(matches!(
            result,
            Err(HeightfieldError::NonFiniteCorner { corner: "top_right", .. })
        ));
        let result = flat_generator().generate_level(2, Corners::new(0.0, 0.0, 0.0, f64::INFINITY));
        assert!(matches!(
            result,
            Err(HeightfieldError::NonFiniteCorner { corner: "bottom_right", .. })
        ));
    }

    #[test]
    fn test_invalid_roughness_is_rejected() {
        let mut generator = HeightfieldGenerator::new(1);
        generator.set_settings(GenerationSettings { roughness: -0.5 });
        let result = generator.generate_level(2, Corners::default());
        assert!(matches!(result, Err(HeightfieldError::InvalidRoughness(_))));
    }
}
