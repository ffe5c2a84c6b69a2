use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::grid::{Grid, Position};

/// Chance of the spawned tile being a 2 rather than a 4.
pub const TWO_PROBABILITY: f64 = 0.9;

/// Source of randomness for tile placement and search sampling.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..n`, `n > 0`.
    fn pick_index(&mut self, n: usize) -> usize;
}

impl<R: Rng> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn pick_index(&mut self, n: usize) -> usize {
        Uniform::from(0..n).sample(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub grid: Grid,
    pub position: Option<Position>,
}

pub fn random_value<R: RandomSource>(rng: &mut R) -> u32 {
    if rng.next_unit() < TWO_PROBABILITY {
        2
    } else {
        4
    }
}

/// Places a 2 or a 4 on a uniformly chosen empty cell.
///
/// A full grid comes back unchanged with no position.
pub fn spawn_tile<R: RandomSource>(grid: &Grid, rng: &mut R) -> Spawn {
    let free: Vec<Position> = grid.empty_positions().collect();
    if free.is_empty() {
        return Spawn {
            grid: *grid,
            position: None,
        };
    }
    let pos = free[rng.pick_index(free.len())];
    let value = random_value(rng);
    Spawn {
        grid: grid.with_tile(pos, value),
        position: Some(pos),
    }
}

/// Picks `count` distinct positions from `cells`, or all of them when
/// there are no more than `count`.
pub fn sample_positions<R: RandomSource>(
    mut cells: Vec<Position>,
    count: usize,
    rng: &mut R,
) -> Vec<Position> {
    if cells.len() <= count {
        return cells;
    }
    for i in 0..count {
        let j = i + rng.pick_index(cells.len() - i);
        cells.swap(i, j);
    }
    cells.truncate(count);
    cells
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::VecDeque;

    /// Replays fixed draws; panics when it runs dry.
    pub(crate) struct Scripted {
        units: VecDeque<f64>,
        indices: VecDeque<usize>,
    }

    impl Scripted {
        pub(crate) fn new(units: &[f64], indices: &[usize]) -> Self {
            Scripted {
                units: units.iter().copied().collect(),
                indices: indices.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for Scripted {
        fn next_unit(&mut self) -> f64 {
            self.units.pop_front().expect("no scripted unit left")
        }

        fn pick_index(&mut self, n: usize) -> usize {
            let index = self.indices.pop_front().expect("no scripted index left");
            assert!(index < n);
            index
        }
    }

    #[test]
    fn test_spawn_picks_scripted_cell() {
        let grid = Grid::new([[2, 0, 4, 0], [2, 2, 2, 2], [2, 2, 2, 2], [2, 2, 2, 0]]);
        // empty cells in row-major order: (0, 1), (0, 3), (3, 3)
        for (index, unit, pos, value) in vec![
            (0, 0.0, (0, 1), 2),
            (1, 0.89, (0, 3), 2),
            (2, 0.9, (3, 3), 4),
            (2, 0.99, (3, 3), 4),
        ] {
            let mut rng = Scripted::new(&[unit], &[index]);
            let spawn = spawn_tile(&grid, &mut rng);
            assert_eq!(spawn.position, Some(pos));
            assert_eq!(spawn.grid[pos.0][pos.1], value);
            assert_eq!(spawn.grid.count_empty(), 2);
        }
        assert_eq!(grid.count_empty(), 3);
    }

    #[test]
    fn test_spawn_on_full_grid_is_noop() {
        let grid = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut rng = Scripted::new(&[], &[]);
        let spawn = spawn_tile(&grid, &mut rng);
        assert_eq!(spawn.position, None);
        assert_eq!(spawn.grid, grid);
    }

    #[test]
    fn test_spawn_distribution() {
        let grid = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 0, 4], [4, 2, 4, 2]]);
        let mut rng = StdRng::seed_from_u64(2048);
        let total = 20_000;
        let fours = (0..total)
            .filter(|_| spawn_tile(&grid, &mut rng).grid[2][2] == 4)
            .count();
        let ratio = fours as f64 / total as f64;
        assert!((ratio - 0.1).abs() < 0.015, "ratio of fours {}", ratio);
    }

    #[test]
    fn test_sample_positions() {
        let cells: Vec<Position> = Grid::default().empty_positions().collect();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = sample_positions(cells.clone(), 4, &mut rng);
        assert_eq!(sample.len(), 4);
        for (i, pos) in sample.iter().enumerate() {
            assert!(cells.contains(pos));
            assert!(!sample[i + 1..].contains(pos));
        }

        let few = cells[..3].to_vec();
        assert_eq!(sample_positions(few.clone(), 4, &mut rng), few);
    }
}
