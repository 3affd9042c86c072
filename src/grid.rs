use serde::{Deserialize, Serialize};

use crate::error::HeightfieldError;

/// Side length of the grid produced at `level`.
///
/// Level 0 is the degenerate single-cell grid. Every other level has
/// `2^level + 1` cells per side.
pub fn span_for_level(level: u32) -> usize {
    if level == 0 {
        1
    } else {
        (1usize << level) + 1
    }
}

/// Inverse of [`span_for_level`]. A span of 2 is the four-corner grid and
/// also maps to level 0.
pub fn level_for_span(span: usize) -> Option<u32> {
    match span {
        0 => None,
        1 | 2 => Some(0),
        _ if (span - 1).is_power_of_two() => Some((span - 1).trailing_zeros()),
        _ => None,
    }
}

/// Elevations pinned at the four corners of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Corners {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_left: f64,
    pub bottom_right: f64,
}

impl Corners {
    pub const fn new(top_left: f64, top_right: f64, bottom_left: f64, bottom_right: f64) -> Self {
        Self {
            top_left,
            top_right,
            bottom_left,
            bottom_right,
        }
    }

    pub const fn uniform(value: f64) -> Self {
        Self::new(value, value, value, value)
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.top_left, self.top_right, self.bottom_left, self.bottom_right]
    }

    pub fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("top_left", self.top_left),
            ("top_right", self.top_right),
            ("bottom_left", self.bottom_left),
            ("bottom_right", self.bottom_right),
        ]
    }

    pub fn max(&self) -> f64 {
        self.as_array().into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn average(&self) -> f64 {
        self.as_array().iter().sum::<f64>() / 4.0
    }
}

impl Default for Corners {
    fn default() -> Self {
        Self::uniform(0.0)
    }
}

/// Working buffer for a generation run. Cells stay `None` until the
/// algorithm assigns them.
#[derive(Debug, Clone)]
pub struct HeightGrid {
    span: usize,
    cells: Vec<Vec<Option<f64>>>,
}

impl HeightGrid {
    pub fn new(span: usize) -> Self {
        let cells = vec![vec![None; span]; span];
        HeightGrid { span, cells }
    }

    pub fn span(&self) -> usize {
        self.span
    }

    /// Value at `(x, y)`; `None` when unset or out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.span && y < self.span {
            self.cells[y][x]
        } else {
            None
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some()
    }

    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.cells[y][x] = Some(value);
    }

    /// Assigns the value produced by `value` only if the cell is still
    /// unset. `value` is not called for a set cell. Returns the written
    /// value.
    pub fn set_if_unset_with(&mut self, x: usize, y: usize, value: impl FnOnce() -> f64) -> Option<f64> {
        if self.is_set(x, y) {
            return None;
        }
        let value = value();
        self.set(x, y, value);
        Some(value)
    }

    /// Places the four corners. On a single-cell grid they collapse into
    /// their average.
    pub fn set_corners(&mut self, corners: &Corners) {
        if self.span == 1 {
            self.set(0, 0, corners.average());
            return;
        }
        let last = self.span - 1;
        self.set(0, 0, corners.top_left);
        self.set(last, 0, corners.top_right);
        self.set(0, last, corners.bottom_left);
        self.set(last, last, corners.bottom_right);
    }

    /// Resolves every cell into a finished [`Heightfield`], failing on the
    /// first cell that was never assigned.
    pub fn into_heightfield(self, level: u32, max_height: f64) -> Result<Heightfield, HeightfieldError> {
        let span = self.span;
        let mut heights = Vec::with_capacity(span);
        for (y, row) in self.cells.into_iter().enumerate() {
            let resolved = row
                .into_iter()
                .enumerate()
                .map(|(x, cell)| cell.ok_or(HeightfieldError::UnsetCell { x, y }))
                .collect::<Result<Vec<f64>, _>>()?;
            heights.push(resolved);
        }

        Ok(Heightfield {
            level,
            span,
            heights,
            max_height,
        })
    }
}

/// A fully populated grid of elevations, indexed `heights[y][x]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heightfield {
    pub level: u32,
    pub span: usize,
    pub heights: Vec<Vec<f64>>,
    pub max_height: f64,
}

impl Heightfield {
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        if x < self.span && y < self.span {
            Some(self.heights[y][x])
        } else {
            None
        }
    }

    pub fn min_height(&self) -> f64 {
        self.iter().map(|(_, _, h)| h).fold(f64::INFINITY, f64::min)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.heights
            .iter()
            .enumerate()
            .flat_map(|(y, row)| row.iter().enumerate().map(move |(x, &h)| (x, y, h)))
    }
}
