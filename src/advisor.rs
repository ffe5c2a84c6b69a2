use crate::expectimax::{ExpectimaxPlayer, SearchConfig, SearchResult};
use crate::grid::{Direction, Grid};
use crate::spawn::RandomSource;

/// A pending search request. It owns its own copy of the grid, so later
/// moves on the live grid cannot leak into the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    grid: Grid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advice {
    Suggest { direction: Direction, score: f64 },
    /// The grid it was computed for has no legal move.
    NoMove,
    /// Superseded by a newer request or by a change of the live grid.
    Stale,
}

/// Serializes advisory searches and drops results that no longer match
/// the game being played.
#[derive(Debug, Default)]
pub struct Advisor {
    config: SearchConfig,
    generation: u64,
    current: Option<Direction>,
}

impl Advisor {
    pub fn new(config: SearchConfig) -> Self {
        Advisor {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> SearchConfig {
        self.config
    }

    /// Suggestion accepted for the live grid, if any.
    pub fn current(&self) -> Option<Direction> {
        self.current
    }

    /// Starts a new request, superseding every earlier one.
    pub fn request(&mut self, grid: &Grid) -> Ticket {
        self.generation += 1;
        self.current = None;
        Ticket {
            generation: self.generation,
            grid: *grid,
        }
    }

    /// Forgets the pending request and the standing suggestion.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.current = None;
    }

    pub fn is_current(&self, ticket: &Ticket, live: &Grid) -> bool {
        ticket.generation == self.generation && ticket.grid == *live
    }

    /// Runs the search for `ticket` and keeps the result only if the
    /// ticket is still the latest request and `live` has not changed.
    pub fn resolve<R: RandomSource>(&mut self, ticket: &Ticket, live: &Grid, rng: &mut R) -> Advice {
        if !self.is_current(ticket, live) {
            return Advice::Stale;
        }
        let result = ExpectimaxPlayer::new(self.config, rng).search(&ticket.grid);
        self.accept(ticket, live, result)
    }

    /// Applies a search result computed elsewhere for `ticket`.
    pub fn accept(&mut self, ticket: &Ticket, live: &Grid, result: SearchResult) -> Advice {
        if !self.is_current(ticket, live) {
            return Advice::Stale;
        }
        self.current = result.best_move;
        match result.best_move {
            Some(direction) => Advice::Suggest {
                direction,
                score: result.score,
            },
            None => Advice::NoMove,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn open_grid() -> Grid {
        Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [0, 0, 0, 0]])
    }

    #[test]
    fn test_resolve_current_request() {
        let mut advisor = Advisor::new(SearchConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let grid = open_grid();
        let ticket = advisor.request(&grid);
        match advisor.resolve(&ticket, &grid, &mut rng) {
            Advice::Suggest { direction, .. } => assert_eq!(direction, Direction::Down),
            other => panic!("unexpected advice {:?}", other),
        }
        assert_eq!(advisor.current(), Some(Direction::Down));
    }

    #[test]
    fn test_superseded_request_is_stale() {
        let mut advisor = Advisor::new(SearchConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let grid = open_grid();
        let old = advisor.request(&grid);
        let new = advisor.request(&grid);
        assert_eq!(advisor.resolve(&old, &grid, &mut rng), Advice::Stale);
        assert_ne!(advisor.resolve(&new, &grid, &mut rng), Advice::Stale);
    }

    #[test]
    fn test_result_for_changed_grid_is_stale() {
        let mut advisor = Advisor::new(SearchConfig::default());
        let grid = open_grid();
        let ticket = advisor.request(&grid);
        let moved = grid.apply_move(Direction::Down).grid;
        let result = SearchResult {
            score: 1.0,
            best_move: Some(Direction::Down),
        };
        assert_eq!(advisor.accept(&ticket, &moved, result), Advice::Stale);
        assert_eq!(advisor.current(), None);
    }

    #[test]
    fn test_cancel_drops_pending_and_current() {
        let mut advisor = Advisor::new(SearchConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let grid = open_grid();
        let ticket = advisor.request(&grid);
        advisor.resolve(&ticket, &grid, &mut rng);
        let pending = advisor.request(&grid);
        advisor.cancel();
        assert_eq!(advisor.current(), None);
        assert_eq!(advisor.resolve(&pending, &grid, &mut rng), Advice::Stale);
    }

    #[test]
    fn test_terminal_grid_yields_no_move() {
        let mut advisor = Advisor::new(SearchConfig::default());
        let mut rng = StdRng::seed_from_u64(11);
        let grid = Grid::new([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert_eq!(advisor.config(), SearchConfig::default());
        let ticket = advisor.request(&grid);
        assert_eq!(advisor.resolve(&ticket, &grid, &mut rng), Advice::NoMove);
        assert_eq!(ticket.grid, grid);
    }
}
