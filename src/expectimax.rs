use serde::Deserialize;

use crate::error::Error;
use crate::grid::*;
use crate::heuristic::evaluate;
use crate::spawn::{sample_positions, RandomSource, TWO_PROBABILITY};

pub const DEFAULT_DEPTH: u16 = 3;
pub const DEFAULT_CHANCE_SAMPLES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    /// Plies to explore, counting player and chance turns alike.
    pub depth: u16,
    /// Empty cells examined per chance turn; more are sampled down to this.
    pub chance_samples: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: DEFAULT_DEPTH,
            chance_samples: DEFAULT_CHANCE_SAMPLES,
        }
    }
}

impl SearchConfig {
    /// Rejects settings the search cannot run with.
    pub fn validated(self) -> Result<Self, Error> {
        if self.chance_samples == 0 {
            return Err(Error::ChanceSamples);
        }
        Ok(self)
    }
}

enum Turn {
    Player,
    Chance,
}

impl Turn {
    fn reverse(&self) -> Self {
        match self {
            Turn::Player => Turn::Chance,
            Turn::Chance => Turn::Player,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub score: f64,
    pub best_move: Option<Direction>,
}

impl SearchResult {
    fn leaf(score: f64) -> Self {
        SearchResult {
            score,
            best_move: None,
        }
    }
}

pub struct ExpectimaxPlayer<'a, R> {
    config: SearchConfig,
    rng: &'a mut R,
}

impl<'a, R: RandomSource> ExpectimaxPlayer<'a, R> {
    pub fn new(config: SearchConfig, rng: &'a mut R) -> Self {
        ExpectimaxPlayer { config, rng }
    }

    /// Best direction for `grid`, or `None` when nothing moves.
    pub fn find_best_move(&mut self, grid: &Grid) -> Option<Direction> {
        self.search(grid).best_move
    }

    pub fn search(&mut self, grid: &Grid) -> SearchResult {
        self.expectimax(*grid, self.config.depth, &Turn::Player)
    }

    fn expectimax(&mut self, grid: Grid, depth: u16, turn: &Turn) -> SearchResult {
        if depth == 0 {
            return SearchResult::leaf(evaluate(&grid));
        }
        match turn {
            Turn::Player => {
                let mut best_score = f64::NEG_INFINITY;
                let mut best_move = None;
                for &dir in Direction::ALL.iter() {
                    let result = grid.apply_move(dir);
                    if !result.moved {
                        continue;
                    }
                    let SearchResult { score, .. } =
                        self.expectimax(result.grid, depth - 1, &turn.reverse());
                    // if there was any move whatsoever, keep it
                    if score > best_score || best_move.is_none() {
                        best_score = score;
                        best_move = Some(dir);
                    }
                }
                SearchResult {
                    score: best_score,
                    best_move,
                }
            }
            Turn::Chance => {
                let free: Vec<Position> = grid.empty_positions().collect();
                if free.is_empty() {
                    return SearchResult::leaf(evaluate(&grid));
                }
                // at least one cell, so the average below stays defined
                let count = self.config.chance_samples.max(1);
                let candidates = sample_positions(free, count, &mut *self.rng);
                let mut total = 0.0;
                for &pos in candidates.iter() {
                    for &(value, weight) in
                        [(2, TWO_PROBABILITY), (4, 1.0 - TWO_PROBABILITY)].iter()
                    {
                        // each branch gets its own copy of the grid
                        let child = grid.with_tile(pos, value);
                        total += weight * self.expectimax(child, depth - 1, &turn.reverse()).score;
                    }
                }
                SearchResult::leaf(total / candidates.len() as f64)
            }
        }
    }
}

/// Runs a search with the given configuration on a copy of `grid`.
pub fn best_move<R: RandomSource>(
    grid: &Grid,
    config: SearchConfig,
    rng: &mut R,
) -> Option<Direction> {
    ExpectimaxPlayer::new(config, rng).find_best_move(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spawn::spawn_tile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_terminal_grid_has_no_move() {
        let grid = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(best_move(&grid, SearchConfig::default(), &mut rng), None);
    }

    #[test]
    fn test_single_legal_move() {
        let grid = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [0, 0, 0, 0]]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            best_move(&grid, SearchConfig::default(), &mut rng),
            Some(Direction::Down)
        );
    }

    #[test]
    fn test_move_into_certain_loss_is_still_suggested() {
        // Every tile is distinct, so after Up or Left any spawn fills the
        // board with no merge left.
        let grid = Grid::new([
            [0, 8, 16, 32],
            [64, 128, 256, 512],
            [1024, 2048, 4096, 8192],
            [16384, 32768, 65536, 131072],
        ]);
        let mut rng = StdRng::seed_from_u64(3);
        let result = ExpectimaxPlayer::new(SearchConfig::default(), &mut rng).search(&grid);
        assert_eq!(result.score, f64::NEG_INFINITY);
        assert_eq!(result.best_move, Some(Direction::Up));
    }

    #[test]
    fn test_search_leaves_grid_untouched() {
        let grid = Grid::new([[2, 0, 0, 2], [0, 4, 0, 0], [0, 0, 8, 0], [0, 0, 0, 0]]);
        let copy = grid;
        let mut rng = StdRng::seed_from_u64(5);
        best_move(&grid, SearchConfig::default(), &mut rng);
        assert_eq!(grid, copy);
    }

    #[test]
    fn test_depth_zero_returns_evaluation() {
        let grid = Grid::new([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let config = SearchConfig {
            depth: 0,
            ..SearchConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let result = ExpectimaxPlayer::new(config, &mut rng).search(&grid);
        assert_eq!(result.best_move, None);
        assert_eq!(result.score, evaluate(&grid));
    }

    #[test]
    fn test_depth_two_averages_every_spawn() {
        // A 16-sample config averages over every empty cell.
        let grid = Grid::new([[0, 2, 2, 0], [0; 4], [0; 4], [0; 4]]);
        let config = SearchConfig {
            depth: 2,
            chance_samples: 16,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let result = ExpectimaxPlayer::new(config, &mut rng).search(&grid);

        let expected = |dir: Direction| {
            let after = grid.apply_move(dir).grid;
            let free: Vec<Position> = after.empty_positions().collect();
            free.iter()
                .map(|&pos| {
                    0.9 * evaluate(&after.with_tile(pos, 2))
                        + 0.1 * evaluate(&after.with_tile(pos, 4))
                })
                .sum::<f64>()
                / free.len() as f64
        };
        let best = Direction::ALL
            .iter()
            .filter(|&&dir| grid.can_move(dir))
            .map(|&dir| expected(dir))
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((result.score - best).abs() < 1e-9);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_config_from_json() {
        let config: SearchConfig = serde_json::from_str(r#"{"depth":5}"#).unwrap();
        assert_eq!(
            config.validated(),
            Ok(SearchConfig {
                depth: 5,
                chance_samples: DEFAULT_CHANCE_SAMPLES,
            })
        );

        let config: SearchConfig = serde_json::from_str(r#"{"chanceSamples":0}"#).unwrap();
        assert_eq!(config.validated(), Err(Error::ChanceSamples));
    }

    #[test]
    fn test_zero_samples_still_scores_spawns() {
        let grid = Grid::new([[2, 2, 0, 0], [0, 4, 0, 0], [0; 4], [0; 4]]);
        let config = SearchConfig {
            depth: 3,
            chance_samples: 0,
        };
        let mut rng = StdRng::seed_from_u64(13);
        let result = ExpectimaxPlayer::new(config, &mut rng).search(&grid);
        assert!(result.score.is_finite(), "score {}", result.score);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_suggestions_are_legal() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut grid = spawn_tile(&Grid::default(), &mut rng).grid;
        grid = spawn_tile(&grid, &mut rng).grid;
        let mut turns = 0;
        while !grid.is_game_over() && turns < 60 {
            let dir = best_move(&grid, SearchConfig::default(), &mut rng)
                .expect("non-terminal grid must have a suggestion");
            let result = grid.apply_move(dir);
            assert!(result.moved, "{} does not move {:?}", dir, grid);
            grid = spawn_tile(&result.grid, &mut rng).grid;
            turns += 1;
        }
    }
}
