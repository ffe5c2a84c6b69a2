use serde::Serialize;

use crate::grid::{Direction, Grid, Position};
use crate::spawn::{spawn_tile, RandomSource};

pub const START_TILES: usize = 2;

/// What a single player move did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveOutcome {
    pub moved: bool,
    pub gained: u64,
    pub game_over: bool,
    pub new_best: bool,
}

/// Read-only view handed to the commentary service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub grid: Grid,
    pub score: u64,
    pub moves: u32,
    pub max_tile: u32,
    pub last_direction: Option<Direction>,
    pub is_game_over: bool,
}

impl Snapshot {
    /// One-line context for a text generator.
    pub fn describe(&self, event: &str) -> String {
        format!(
            "event:{} score:{} maxTile:{} moves:{} lastDirection:{} board:{:?}",
            event,
            self.score,
            self.max_tile,
            self.moves,
            self.last_direction.map_or("none", |dir| dir.as_str()),
            self.grid.rows(),
        )
    }
}

/// The single authoritative game of the host.
#[derive(Default)]
pub struct State {
    pub total_score: u64,
    pub best_score: u64,
    pub delta_score: u64, // score gained by the last move
    pub moves: u32,
    pub game_over: bool,
    pub last_direction: Option<Direction>,

    pub grid: Grid,
    pub prev_grid: Option<Grid>,
    pub spawned: Option<Position>,
    pub merged: Vec<Position>,
}

impl State {
    pub fn new<R: RandomSource>(best_score: u64, rng: &mut R) -> Self {
        let mut state = State {
            best_score,
            ..Default::default()
        };
        state.start(rng);
        state
    }

    /// Clears the board and places the starting tiles. The best score
    /// survives.
    pub fn reset<R: RandomSource>(&mut self, rng: &mut R) {
        let _ = std::mem::replace(
            self,
            Self {
                best_score: self.best_score,
                ..Default::default()
            },
        );
        self.start(rng);
    }

    fn start<R: RandomSource>(&mut self, rng: &mut R) {
        for _ in 0..START_TILES {
            self.grid = spawn_tile(&self.grid, rng).grid;
        }
        self.prev_grid = Some(self.grid);
    }

    /// Slides the board, spawns a tile when something moved and checks
    /// for the end of the game on the post-spawn grid.
    pub fn update<R: RandomSource>(&mut self, dir: Direction, rng: &mut R) -> MoveOutcome {
        if self.game_over {
            return MoveOutcome {
                game_over: true,
                ..Default::default()
            };
        }
        let result = self.grid.apply_move(dir);
        if !result.moved {
            return MoveOutcome::default();
        }
        let spawn = spawn_tile(&result.grid, rng);

        self.prev_grid = Some(self.grid);
        self.grid = spawn.grid;
        self.spawned = spawn.position;
        self.merged = result.merged;
        self.delta_score = result.gained;
        self.total_score += result.gained;
        self.moves += 1;
        self.last_direction = Some(dir);
        self.game_over = self.grid.is_game_over();

        let new_best = self.total_score > self.best_score;
        if new_best {
            self.best_score = self.total_score;
        }
        MoveOutcome {
            moved: true,
            gained: result.gained,
            game_over: self.game_over,
            new_best,
        }
    }

    pub fn max_tile(&self) -> u32 {
        self.grid.max_tile()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            grid: self.grid,
            score: self.total_score,
            moves: self.moves,
            max_tile: self.max_tile(),
            last_direction: self.last_direction,
            is_game_over: self.game_over,
        }
    }
}
