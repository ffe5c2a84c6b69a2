// Heuristic terms follow the classic weighting from
// https://github.com/ovolve/2048-AI

use itertools::Itertools;
use std::cmp::max;

use crate::grid::*;

const SMOOTH_WEIGHT: f64 = 0.1;
const MONO_WEIGHT: f64 = 1.0;
const EMPTY_WEIGHT: f64 = 2.7;
const MAX_WEIGHT: f64 = 1.0;

const fn num_bits<T>() -> usize {
    std::mem::size_of::<T>() * 8
}

/// Exponent of a power-of-two tile; empty cells count as 0.
pub fn log_2(x: u32) -> u32 {
    if x == 0 {
        return 0;
    }
    num_bits::<u32>() as u32 - x.leading_zeros() - 1
}

const CORNERS: [Position; 4] = [(0, 0), (0, SIDE - 1), (SIDE - 1, 0), (SIDE - 1, SIDE - 1)];

/// Static board score, higher is better for the player.
pub fn evaluate(grid: &Grid) -> f64 {
    smoothness(grid) as f64 * SMOOTH_WEIGHT
        + monotonicity(grid) as f64 * MONO_WEIGHT
        + empty_term(grid) * EMPTY_WEIGHT
        + corner_bonus(grid) as f64 * MAX_WEIGHT
}

/// Natural log of the empty cell count, 0 on a full grid.
pub fn empty_term(grid: &Grid) -> f64 {
    match grid.count_empty() {
        0 => 0.0,
        n => (n as f64).ln(),
    }
}

/// log2 of the largest tile when it sits in a corner.
///
/// Ties go to the first maximum in row-major order.
pub fn corner_bonus(grid: &Grid) -> u32 {
    let mut best: Option<(Position, u32)> = None;
    for &(x, y) in POSITIONS.iter() {
        let value = grid[x][y];
        if value > best.map_or(0, |(_, v)| v) {
            best = Some(((x, y), value));
        }
    }
    match best {
        Some((pos, value)) if CORNERS.contains(&pos) => log_2(value),
        _ => 0,
    }
}

/// Sum over both axes of the better of the two monotonic directions.
pub fn monotonicity(grid: &Grid) -> i32 {
    let (mut up, mut down, mut left, mut right) = (0, 0, 0, 0);

    for i in 0..SIDE {
        let (inc, dec) = line_monotonicity(&TRAVERSALS[Direction::Up as usize][i], grid);
        up += inc;
        down += dec;
        let (inc, dec) = line_monotonicity(&TRAVERSALS[Direction::Left as usize][i], grid);
        left += inc;
        right += dec;
    }
    max(up, down) + max(left, right)
}

fn line_monotonicity(traversal: &[Position; SIDE], grid: &Grid) -> (i32, i32) {
    let (mut inc, mut dec) = (0, 0);
    // Interior zeros are skipped; the two end cells always take part.
    let values = traversal
        .iter()
        .enumerate()
        .filter_map(|(idx, &(x, y))| {
            let val = log_2(grid[x][y]) as i32;
            if val == 0 && idx != 0 && idx != SIDE - 1 {
                return None;
            }
            Some(val)
        });
    for (p, q) in values.tuple_windows() {
        if p > q {
            inc += q - p;
        } else {
            dec += p - q;
        }
    }
    (inc, dec)
}

fn find_next_position(grid: &Grid, x: usize, y: usize, dir: Direction) -> Option<Position> {
    let traversals = TRAVERSALS[dir as usize];
    let traversal = match dir {
        Direction::Left | Direction::Right => traversals[x],
        Direction::Up | Direction::Down => traversals[y],
    };
    let mut start_search = false;
    for &(i, j) in traversal.iter().rev() {
        if !grid.is_empty_at((i, j)) && start_search {
            return Some((i, j));
        }
        if (i, j) == (x, y) {
            start_search = true;
        }
    }
    None
}

/// Penalty for log2 gaps between each tile and its nearest tile
/// to the right and below.
pub fn smoothness(grid: &Grid) -> i32 {
    let mut smoothness = 0;
    for &(i, j) in POSITIONS.iter().filter(|&&pos| !grid.is_empty_at(pos)) {
        let p = log_2(grid[i][j]) as i32;
        for &dir in [Direction::Down, Direction::Right].iter() {
            if let Some((x, y)) = find_next_position(grid, i, j, dir) {
                let q = log_2(grid[x][y]) as i32;
                smoothness -= (p - q).abs();
            }
        }
    }
    smoothness
}
