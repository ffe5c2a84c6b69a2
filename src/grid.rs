use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::Error;

pub const SIDE: usize = 4;
pub const TILES_COUNT: usize = SIDE * SIDE;
/// Largest tile a 4x4 board can build from spawned 4s.
pub const MAX_TILE: u32 = 1 << 17;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up = 0,
    Right,
    Down,
    Left,
}

impl Direction {
    /// Order in which the search tries moves; earlier wins ties.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Left => "left",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "up" => Ok(Direction::Up),
            "right" => Ok(Direction::Right),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            _ => Err(Error::Direction(token.to_owned())),
        }
    }
}

/// (row, column)
pub type Position = (usize, usize);

pub const fn positions() -> [Position; TILES_COUNT] {
    let mut pos: [Position; TILES_COUNT] = [(0, 0); TILES_COUNT];
    let mut i = 0;
    while i < SIDE {
        let mut j = 0;
        while j < SIDE {
            pos[i * SIDE + j] = (i, j);
            j += 1;
        }
        i += 1;
    }
    pos
}
pub const POSITIONS: [Position; TILES_COUNT] = positions();

// Each traversal lists one row or column in merge order: slot 0 is the
// cell tiles slide towards.
const fn build_traversals(dir: &Direction) -> [[Position; SIDE]; SIDE] {
    let mut v: [[Position; SIDE]; SIDE] = [[(0, 0); SIDE]; SIDE];
    let mut i = 0;
    while i < SIDE {
        let mut vv: [Position; SIDE] = [(0, 0); SIDE];
        let mut j = 0;
        while j < SIDE {
            vv[j] = match dir {
                Direction::Up => (j, i),
                Direction::Down => (SIDE - j - 1, i),
                Direction::Left => (i, j),
                Direction::Right => (i, SIDE - j - 1),
            };
            j += 1;
        }
        v[i] = vv;
        i += 1;
    }
    v
}
pub const TRAVERSALS: [[[Position; SIDE]; SIDE]; 4] = [
    build_traversals(&Direction::Up),
    build_traversals(&Direction::Right),
    build_traversals(&Direction::Down),
    build_traversals(&Direction::Left),
];

/// Outcome of sliding a single line towards slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSlide {
    pub line: [u32; SIDE],
    pub gained: u64,
    /// Slots of `line` holding a tile produced by a merge in this pass.
    pub merged: [bool; SIDE],
}

/// Compresses a line towards slot 0 and merges equal neighbours.
///
/// Tiles are paired greedily from slot 0 onwards and a merged tile never
/// merges again in the same pass, so `[2, 2, 2, 2]` becomes `[4, 4, 0, 0]`.
pub fn slide_line(line: [u32; SIDE]) -> LineSlide {
    let mut out = LineSlide {
        line: [0; SIDE],
        gained: 0,
        merged: [false; SIDE],
    };
    let mut tiles = line.iter().copied().filter(|&v| v != 0).peekable();
    let mut slot = 0;
    while let Some(value) = tiles.next() {
        if tiles.peek() == Some(&value) {
            tiles.next();
            let sum = value * 2;
            out.line[slot] = sum;
            out.merged[slot] = true;
            out.gained += u64::from(sum);
        } else {
            out.line[slot] = value;
        }
        slot += 1;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub grid: Grid,
    pub moved: bool,
    pub gained: u64,
    /// Cells of `grid` that received a merged tile.
    pub merged: Vec<Position>,
}

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid([[u32; SIDE]; SIDE]);

impl Index<usize> for Grid {
    type Output = [u32; SIDE];

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Grid {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<[[u32; SIDE]; SIDE]> for Grid {
    fn from(values: [[u32; SIDE]; SIDE]) -> Self {
        Grid(values)
    }
}

impl TryFrom<&[u32]> for Grid {
    type Error = Error;

    /// Builds a grid from row-major cell values.
    fn try_from(values: &[u32]) -> Result<Self, Self::Error> {
        if values.len() != TILES_COUNT {
            return Err(Error::GridSize {
                expected: TILES_COUNT,
                actual: values.len(),
            });
        }
        let mut grid = Grid::default();
        for (&value, &(row, col)) in values.iter().zip(POSITIONS.iter()) {
            if value != 0 && (value == 1 || value > MAX_TILE || !value.is_power_of_two()) {
                return Err(Error::TileValue { row, col, value });
            }
            grid[row][col] = value;
        }
        Ok(grid)
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl Grid {
    pub fn new(values: [[u32; SIDE]; SIDE]) -> Self {
        Grid(values)
    }

    pub fn rows(&self) -> &[[u32; SIDE]; SIDE] {
        &self.0
    }

    pub fn cells(&self) -> impl Iterator<Item = u32> + '_ {
        POSITIONS.iter().map(move |&(x, y)| self[x][y])
    }

    pub fn is_empty_at(&self, (x, y): Position) -> bool {
        self[x][y] == 0
    }

    pub fn empty_positions(&self) -> impl Iterator<Item = Position> + '_ {
        POSITIONS
            .iter()
            .copied()
            .filter(move |&pos| self.is_empty_at(pos))
    }

    pub fn count_empty(&self) -> usize {
        self.empty_positions().count()
    }

    pub fn max_tile(&self) -> u32 {
        self.cells().max().unwrap_or(0)
    }

    pub fn sum(&self) -> u64 {
        self.cells().map(u64::from).sum()
    }

    /// Returns a copy with `value` written at `pos`.
    pub fn with_tile(mut self, (x, y): Position, value: u32) -> Self {
        self[x][y] = value;
        self
    }

    /// Slides every row or column towards `dir`. The receiver is untouched.
    pub fn apply_move(&self, dir: Direction) -> MoveResult {
        let mut grid = *self;
        let mut gained = 0;
        let mut merged = Vec::new();

        for traversal in TRAVERSALS[dir as usize].iter() {
            let mut line = [0; SIDE];
            for (slot, &(x, y)) in traversal.iter().enumerate() {
                line[slot] = self[x][y];
            }
            let slide = slide_line(line);
            for (slot, &(x, y)) in traversal.iter().enumerate() {
                grid[x][y] = slide.line[slot];
                if slide.merged[slot] {
                    merged.push((x, y));
                }
            }
            gained += slide.gained;
        }
        MoveResult {
            moved: grid != *self,
            grid,
            gained,
            merged,
        }
    }

    pub fn can_move(&self, dir: Direction) -> bool {
        self.apply_move(dir).moved
    }

    /// True when the grid is full and no two neighbours are equal.
    pub fn is_game_over(&self) -> bool {
        if self.count_empty() != 0 {
            return false;
        }
        !self.has_equal_neighbours(Direction::Left) && !self.has_equal_neighbours(Direction::Up)
    }

    fn has_equal_neighbours(&self, dir: Direction) -> bool {
        TRAVERSALS[dir as usize].iter().any(|traversal| {
            traversal
                .windows(2)
                .any(|pair| self[pair[0].0][pair[0].1] == self[pair[1].0][pair[1].1])
        })
    }
}
