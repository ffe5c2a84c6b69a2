use serde::Serialize;

use crate::grid::Direction;
use crate::spawn::RandomSource;
use crate::state::MoveOutcome;

const MEDIUM_MERGE: u64 = 32;
const LARGE_MERGE: u64 = 128;
const CROWDED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Start,
    MergeSmall,
    MergeMedium,
    MergeLarge,
    GridFull,
    BadMove,
    HighScore,
    GameOver,
    Idle,
}

impl Event {
    pub fn as_str(self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::MergeSmall => "merge_small",
            Event::MergeMedium => "merge_medium",
            Event::MergeLarge => "merge_large",
            Event::GridFull => "grid_full",
            Event::BadMove => "bad_move",
            Event::HighScore => "high_score",
            Event::GameOver => "game_over",
            Event::Idle => "idle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Excited,
    Worried,
    Sarcastic,
    Neutral,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Excited => "excited",
            Mood::Worried => "worried",
            Mood::Sarcastic => "sarcastic",
            Mood::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub text: &'static str,
    pub mood: Mood,
}

const fn line(text: &'static str, mood: Mood) -> Comment {
    Comment { text, mood }
}

const START: &[Comment] = &[
    line("Ready? Let's go for 4096!", Mood::Excited),
    line("I'll be watching every move...", Mood::Neutral),
    line("Feeling lucky today!", Mood::Happy),
    line("Deep breath. Showtime.", Mood::Happy),
];
const MERGE_SMALL: &[Comment] = &[
    line("Every bit counts!", Mood::Happy),
    line("Slow and steady.", Mood::Neutral),
    line("Nice start.", Mood::Happy),
    line("Keep up this rhythm.", Mood::Neutral),
];
const MERGE_MEDIUM: &[Comment] = &[
    line("Nice! That one mattered.", Mood::Happy),
    line("Merged and kept the formation.", Mood::Excited),
    line("Starting to look like a pro.", Mood::Happy),
    line("Smooth moves.", Mood::Excited),
];
const MERGE_LARGE: &[Comment] = &[
    line("Wow! The score takes off!", Mood::Excited),
    line("Pure art!", Mood::Excited),
    line("I'm starting to admire you!", Mood::Excited),
    line("That big tile looks great.", Mood::Happy),
];
const GRID_FULL: &[Comment] = &[
    line("Running out of room, careful!", Mood::Worried),
    line("Getting crowded... leave some space.", Mood::Worried),
    line("Don't box yourself into a corner.", Mood::Worried),
];
const BAD_MOVE: &[Comment] = &[
    line("Hmm... that was a bit risky.", Mood::Worried),
    line("That stray 2 might trap you.", Mood::Worried),
    line("I wouldn't have done that.", Mood::Sarcastic),
];
const HIGH_SCORE: &[Comment] = &[
    line("New record! You are the 2048 deity!", Mood::Excited),
    line("4096 is waving at you!", Mood::Happy),
];
const GAME_OVER: &[Comment] = &[
    line("Win some, lose some. Try again!", Mood::Neutral),
    line("There was a way out a moment ago...", Mood::Sarcastic),
    line("Don't give up, one more round!", Mood::Happy),
    line("So close. Next one's yours.", Mood::Neutral),
];
const IDLE: &[Comment] = &[
    line("Thinking? Try moving down.", Mood::Neutral),
    line("Don't hesitate, chances slip away.", Mood::Worried),
    line("I'm falling asleep here...", Mood::Sarcastic),
    line("Looks to me like left could work.", Mood::Neutral),
];

pub fn lines(event: Event) -> &'static [Comment] {
    match event {
        Event::Start => START,
        Event::MergeSmall => MERGE_SMALL,
        Event::MergeMedium => MERGE_MEDIUM,
        Event::MergeLarge => MERGE_LARGE,
        Event::GridFull => GRID_FULL,
        Event::BadMove => BAD_MOVE,
        Event::HighScore => HIGH_SCORE,
        Event::GameOver => GAME_OVER,
        Event::Idle => IDLE,
    }
}

/// Draws one canned line for `event`.
pub fn pick<R: RandomSource>(event: Event, rng: &mut R) -> Comment {
    let choices = lines(event);
    choices[rng.pick_index(choices.len())]
}

/// Picks the event worth commenting on after an accepted move.
///
/// `suggested` is the advisor's standing suggestion before the move.
pub fn classify(
    outcome: &MoveOutcome,
    played: Direction,
    suggested: Option<Direction>,
    empty_cells: usize,
) -> Option<Event> {
    if !outcome.moved {
        return None;
    }
    let crowded = empty_cells <= CROWDED;
    let event = if outcome.game_over {
        Event::GameOver
    } else if outcome.new_best {
        Event::HighScore
    } else if outcome.gained >= LARGE_MERGE {
        Event::MergeLarge
    } else if crowded && suggested.map_or(false, |dir| dir != played) {
        Event::BadMove
    } else if crowded {
        Event::GridFull
    } else if outcome.gained >= MEDIUM_MERGE {
        Event::MergeMedium
    } else if outcome.gained > 0 {
        Event::MergeSmall
    } else {
        return None;
    };
    Some(event)
}
