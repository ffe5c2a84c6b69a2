// unused_unit false positives from wasm-bindgen (as of Rust 1.59.0)
#![allow(clippy::unused_unit)]
#![warn(rust_2018_idioms)]

pub mod advisor;
pub mod commentary;
pub mod error;
pub mod expectimax;
pub mod grid;
pub mod heuristic;
pub mod spawn;
pub mod state;

use rand::rngs::ThreadRng;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::convert::TryFrom;
use std::rc::Rc;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::console;

use crate::advisor::{Advice, Advisor, Ticket};
use crate::commentary::Event;
use crate::expectimax::SearchConfig;
use crate::grid::{Direction, Grid, Position, SIDE};
use crate::state::State;

type JsResult<T> = Result<T, JsValue>;
type JsError = Result<(), JsValue>;

const BEST_SCORE: &str = "2048bestScore";
const SEARCH_CONFIG_ATTR: &str = "data-search-config";

const ADVICE_DELAY_MS: i32 = 150;
const AUTO_PLAY_MS: i32 = 200;
const IDLE_MS: i32 = 15_000;
const MIN_SWIPE: i32 = 30;

enum Key {
    Direction(Direction),
    Restart,
    ToggleMachinePlay,
}

impl TryFrom<u32> for Key {
    type Error = JsValue;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            82 => Ok(Key::Restart),                          // R
            80 => Ok(Key::ToggleMachinePlay),                // P
            38 | 75 => Ok(Key::Direction(Direction::Up)),    // Up | Vim up
            37 | 72 => Ok(Key::Direction(Direction::Left)),  // Left | Vim left
            40 | 74 => Ok(Key::Direction(Direction::Down)),  // Down | Vim down
            39 | 76 => Ok(Key::Direction(Direction::Right)), // Right | Vim right
            _ => Err(format!("Invalid code: {}", code).into()),
        }
    }
}

/// Direction of a swipe, or `None` when it is too short to count.
fn swipe_direction(dx: i32, dy: i32) -> Option<Direction> {
    if dx.abs().max(dy.abs()) <= MIN_SWIPE {
        return None;
    }
    Some(if dx.abs() > dy.abs() {
        if dx > 0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0 {
        Direction::Down
    } else {
        Direction::Up
    })
}

fn log(msg: &str) {
    console::log_1(&JsValue::from_str(msg));
}

fn debug(msg: &str) {
    console::debug_1(&JsValue::from_str(msg));
}

fn now() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map_or(0.0, |performance| performance.now())
}

fn read_search_config(container: &web_sys::Element) -> SearchConfig {
    match container.get_attribute(SEARCH_CONFIG_ATTR) {
        Some(raw) => serde_json::from_str::<SearchConfig>(&raw)
            .map_err(|err| err.to_string())
            .and_then(|config| config.validated().map_err(|err| err.to_string()))
            .unwrap_or_else(|err| {
                log(&format!("ignoring {}: {}", SEARCH_CONFIG_ATTR, err));
                SearchConfig::default()
            }),
        None => SearchConfig::default(),
    }
}

struct Board {
    doc: web_sys::Document,
    storage: Option<web_sys::Storage>,

    game_container: web_sys::Element,
    tile_container: web_sys::Element,
    score_container: web_sys::Element,
    best_score_container: web_sys::Element,
    message_container: web_sys::Element,
    hint_container: Option<web_sys::Element>,
    comment_container: Option<web_sys::Element>,

    state: State,
    advisor: Advisor,
    rng: ThreadRng,
    advice_timeout: Option<i32>,
    idle_timeout: Option<i32>,
}

impl Board {
    fn new(doc: web_sys::Document, storage: Option<web_sys::Storage>) -> JsResult<Board> {
        let grid_container = doc
            .query_selector(".grid-container")?
            .ok_or("couldn't find 'grid-container'")?;

        for _ in 0..SIDE {
            let grid_row_div = doc.create_element("div")?;
            grid_row_div.class_list().add_1("grid-row")?;

            for _ in 0..SIDE {
                let grid_cell_div = doc.create_element("div")?;
                grid_cell_div.class_list().add_1("grid-cell")?;
                grid_row_div.append_child(&grid_cell_div)?;
            }
            grid_container.append_child(&grid_row_div)?;
        }

        let game_container = doc
            .query_selector(".game-container")?
            .ok_or("couldn't find '.game-container'")?;
        let config = read_search_config(&game_container);

        let best_score = match &storage {
            Some(storage) => storage
                .get_item(BEST_SCORE)?
                .and_then(|value| value.parse().ok())
                .unwrap_or(0),
            None => 0,
        };
        let mut rng = rand::thread_rng();

        Ok(Self {
            tile_container: doc
                .query_selector(".tile-container")?
                .ok_or("couldn't find '.tile-container'")?,
            score_container: doc
                .query_selector(".score-container")?
                .ok_or("couldn't find '.score-container'")?,
            best_score_container: doc
                .query_selector(".best-container")?
                .ok_or("couldn't find '.best-container'")?,
            message_container: doc
                .query_selector(".game-message")?
                .ok_or("couldn't find '.game-message'")?,
            hint_container: doc.query_selector(".ai-hint")?,
            comment_container: doc.query_selector(".ai-bubble")?,
            state: State::new(best_score, &mut rng),
            advisor: Advisor::new(config),
            rng,
            advice_timeout: None,
            idle_timeout: None,
            game_container,
            doc,
            storage,
        })
    }

    fn start_game(&mut self) -> JsError {
        self.clear_message()?;
        self.advisor.cancel();
        self.state.reset(&mut self.rng);
        self.render()?;
        self.comment(Event::Start)
    }

    /// Applies a move to the live game. Returns whether the grid changed.
    fn make_move(&mut self, dir: Direction) -> JsResult<bool> {
        let suggested = self.advisor.current();
        let outcome = self.state.update(dir, &mut self.rng);
        if !outcome.moved {
            return Ok(false);
        }
        self.advisor.cancel();
        self.render()?;
        if outcome.new_best {
            self.save_best_score()?;
        }
        let empty = self.state.grid.count_empty();
        if let Some(event) = commentary::classify(&outcome, dir, suggested, empty) {
            self.comment(event)?;
        }
        if outcome.game_over {
            self.print_game_over()?;
        }
        Ok(true)
    }

    fn render(&mut self) -> JsError {
        self.clear_container()?;

        for &(x, y) in grid::POSITIONS.iter() {
            let value = self.state.grid[x][y];
            if value != 0 {
                self.render_tile((x, y), value)?;
            }
        }
        self.render_scores()?;
        self.render_hint(None)?;

        let snapshot = to_json(&self.state.snapshot())?;
        self.game_container.set_attribute("data-snapshot", &snapshot)
    }

    fn render_tile(&self, position: Position, value: u32) -> JsError {
        fn position_class((x, y): &Position) -> String {
            format!("tile-position-{}-{}", y + 1, x + 1)
        }

        let wrapper = self.doc.create_element("div")?;
        let inner = self.doc.create_element("div")?;

        let mut classes = vec![
            "tile".to_owned(),
            format!("tile-{}", value),
            position_class(&position),
        ];
        if value > 2048 {
            classes.push("tile-super".to_owned());
        }
        if self.state.spawned == Some(position) {
            classes.push("tile-new".to_owned());
        } else if self.state.merged.contains(&position) {
            classes.push("tile-merged".to_owned());
        }
        wrapper.set_attribute("class", &classes.join(" "))?;

        inner.class_list().add_1("tile-inner")?;
        inner.set_text_content(Some(&value.to_string()));

        wrapper.append_child(&inner)?;
        self.tile_container.append_child(&wrapper)?;
        Ok(())
    }

    fn clear_container(&self) -> JsError {
        while let Some(first_child) = self.tile_container.first_child() {
            self.tile_container.remove_child(&first_child)?;
        }
        Ok(())
    }

    fn render_scores(&mut self) -> JsError {
        self.score_container
            .set_text_content(Some(&self.state.total_score.to_string()));
        if self.state.delta_score > 0 {
            let animation = self.doc.create_element("div")?;
            animation.class_list().add_1("score-addition")?;
            animation.set_text_content(Some(&format!("+{}", self.state.delta_score)));
            self.score_container.append_child(&animation)?;
        }
        self.best_score_container
            .set_text_content(Some(&self.state.best_score.to_string()));
        Ok(())
    }

    fn render_hint(&self, advice: Option<Advice>) -> JsError {
        if let Some(hint) = &self.hint_container {
            let text = match advice {
                Some(Advice::Suggest { direction, .. }) => format!("AI suggests: {}", direction),
                Some(Advice::NoMove) => "AI: no moves left".to_owned(),
                Some(Advice::Stale) | None => String::new(),
            };
            hint.set_text_content(Some(&text));
        }
        Ok(())
    }

    fn comment(&mut self, event: Event) -> JsError {
        let context = self.state.snapshot().describe(event.as_str());
        self.game_container.set_attribute("data-comment-context", &context)?;

        if let Some(bubble) = &self.comment_container {
            let comment = commentary::pick(event, &mut self.rng);
            bubble.set_text_content(Some(comment.text));
            bubble.set_attribute("data-mood", comment.mood.as_str())?;
        }
        Ok(())
    }

    fn print_game_over(&mut self) -> JsError {
        self.message_container.class_list().add_1("game-over")?;
        self.message_container
            .get_elements_by_tag_name("p")
            .item(0)
            .ok_or_else(|| JsValue::from_str("Couldn't find <p> tag in .game-container"))?
            .set_text_content(Some("Game over!"));
        Ok(())
    }

    fn clear_message(&mut self) -> JsError {
        self.message_container
            .class_list()
            .remove_2("game-won", "game-over")
    }

    fn save_best_score(&self) -> JsError {
        if let Some(storage) = &self.storage {
            storage.set_item(BEST_SCORE, &self.state.best_score.to_string())?
        }
        Ok(())
    }

    fn request_advice(&mut self) -> Ticket {
        if let Some(handle) = self.advice_timeout.take() {
            clear_timeout(handle);
        }
        self.advisor.request(&self.state.grid)
    }

    /// Runs the search for `ticket` and shows the result unless the game
    /// has moved on in the meantime.
    fn advise(&mut self, ticket: &Ticket) -> JsResult<Advice> {
        self.advice_timeout = None;
        let start = now();
        let advice = self
            .advisor
            .resolve(ticket, &self.state.grid, &mut self.rng);
        let elapsed = now() - start;

        match advice {
            Advice::Suggest { direction, score } => log(&format!(
                "AI thought for {:.2}ms, chosen: {}, score: {}",
                elapsed, direction, score
            )),
            Advice::NoMove => log(&format!("AI thought for {:.2}ms, no move", elapsed)),
            Advice::Stale => {
                debug("discarding stale AI suggestion");
                return Ok(advice);
            }
        }
        self.render_hint(Some(advice))?;
        Ok(advice)
    }

    fn best_move_now(&mut self) -> JsResult<Option<Direction>> {
        let ticket = self.request_advice();
        Ok(match self.advise(&ticket)? {
            Advice::Suggest { direction, .. } => Some(direction),
            Advice::NoMove | Advice::Stale => None,
        })
    }
}

fn schedule_advice(board: &Rc<RefCell<Board>>) {
    let ticket = board.borrow_mut().request_advice();
    let bc = Rc::clone(board);
    let handle = set_timeout(
        move || {
            bc.borrow_mut()
                .advise(&ticket)
                .expect("couldn't render AI suggestion");
        },
        ADVICE_DELAY_MS,
    );
    board.borrow_mut().advice_timeout = Some(handle);
}

fn schedule_idle(board: &Rc<RefCell<Board>>) {
    if let Some(handle) = board.borrow_mut().idle_timeout.take() {
        clear_timeout(handle);
    }
    let bc = Rc::clone(board);
    let handle = set_timeout(
        move || {
            let mut board = bc.borrow_mut();
            board.idle_timeout = None;
            if !board.state.game_over {
                board.comment(Event::Idle).expect("couldn't render comment");
            }
        },
        IDLE_MS,
    );
    board.borrow_mut().idle_timeout = Some(handle);
}

fn play(board: &Rc<RefCell<Board>>, dir: Direction) -> JsError {
    let moved = board.borrow_mut().make_move(dir)?;
    if moved {
        schedule_advice(board);
        schedule_idle(board);
    }
    Ok(())
}

fn restart(board: &Rc<RefCell<Board>>) -> JsError {
    board.borrow_mut().start_game()?;
    schedule_advice(board);
    schedule_idle(board);
    Ok(())
}

fn add_event_listener<E, I, T>(element: I, event: &str, handler: T)
where
    E: 'static + FromWasmAbi,
    I: Into<web_sys::EventTarget>,
    T: 'static + FnMut(E),
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(_)>);
    let target: web_sys::EventTarget = element.into();
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .unwrap();
    closure.forget();
}

fn request_animation_frame<T: 'static + FnMut()>(handler: T) {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut()>);
    let window = web_sys::window().expect("no global `window` exists");
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .unwrap();
    closure.forget();
}

fn set_timeout<T: 'static + FnMut()>(f: T, timeout: i32) -> i32 {
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
    let window = web_sys::window().expect("no global `window` exists");
    let id = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            timeout,
        )
        .expect("could not set timeout");
    closure.forget();
    id
}

fn clear_timeout(handle: i32) {
    let window = web_sys::window().expect("no global `window` exists");
    window.clear_timeout_with_handle(handle);
}

fn set_interval<T: 'static + FnMut()>(f: T, timeout: i32) -> i32 {
    let closure = Closure::wrap(Box::new(f) as Box<dyn FnMut()>);
    let window = web_sys::window().expect("no global `window` exists");
    let id = window
        .set_interval_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            timeout,
        )
        .expect("could not set interval");
    closure.forget();
    id
}

fn clear_interval(handle: i32) {
    let window = web_sys::window().expect("no global `window` exists");
    window.clear_interval_with_handle(handle);
}

#[derive(Serialize)]
struct MoveReply {
    grid: Vec<u32>,
    moved: bool,
    gained: u64,
    merged: Vec<Position>,
}

fn to_json<T: Serialize>(value: &T) -> JsResult<String> {
    serde_json::to_string(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Slides row-major `cells` towards `direction` without spawning.
#[wasm_bindgen(js_name = applyMove)]
pub fn apply_move(cells: &[u32], direction: &str) -> JsResult<String> {
    let grid = Grid::try_from(cells)?;
    let result = grid.apply_move(direction.parse()?);
    to_json(&MoveReply {
        grid: result.grid.cells().collect(),
        moved: result.moved,
        gained: result.gained,
        merged: result.merged,
    })
}

#[wasm_bindgen(js_name = isGameOver)]
pub fn is_game_over(cells: &[u32]) -> JsResult<bool> {
    Ok(Grid::try_from(cells)?.is_game_over())
}

/// Default-depth expectimax suggestion for row-major `cells`.
#[wasm_bindgen(js_name = bestMove)]
pub fn best_move(cells: &[u32]) -> JsResult<Option<String>> {
    let grid = Grid::try_from(cells)?;
    let best = expectimax::best_move(&grid, SearchConfig::default(), &mut rand::thread_rng());
    Ok(best.map(|dir| dir.as_str().to_owned()))
}

#[wasm_bindgen(start)]
pub fn main() -> JsError {
    #[cfg(debug_assertions)]
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));

    let window = web_sys::window().expect("no global `window` exists");
    let doc = window.document().expect("should have a document on window");
    let storage = window
        .local_storage()
        .expect("couldn't access local storage");

    let new_game_button = doc
        .query_selector(".restart-button")?
        .ok_or("couldn't find '.restart-button'")?;
    let retry_button = doc
        .query_selector(".retry-button")?
        .ok_or("couldn't find '.retry-button'")?;

    let board = Rc::new(RefCell::new(Board::new(doc, storage)?));
    let game_container = board.borrow().game_container.clone();
    log(&format!("advisor running with {:?}", board.borrow().advisor.config()));
    restart(&board)?;

    macro_rules! restart_on_event {
        ($button:expr) => {
            let bc = Rc::clone(&board);
            add_event_listener($button, "click", move |_: web_sys::Event| {
                restart(&bc).expect("couldn't restart game");
            });
        };
    }
    restart_on_event!(new_game_button);
    restart_on_event!(retry_button);

    let touch_start: Rc<Cell<Option<(i32, i32)>>> = Rc::new(Cell::new(None));
    {
        let touch_start = Rc::clone(&touch_start);
        add_event_listener(
            game_container.clone(),
            "touchstart",
            move |e: web_sys::TouchEvent| {
                touch_start.set(
                    e.touches()
                        .get(0)
                        .map(|touch| (touch.client_x(), touch.client_y())),
                );
            },
        );
    }
    {
        let bc = Rc::clone(&board);
        add_event_listener(game_container, "touchend", move |e: web_sys::TouchEvent| {
            let (start, end) = match (touch_start.take(), e.changed_touches().get(0)) {
                (Some(start), Some(end)) => (start, end),
                _ => return,
            };
            let dx = end.client_x() - start.0;
            let dy = end.client_y() - start.1;
            if let Some(dir) = swipe_direction(dx, dy) {
                e.prevent_default();
                play(&bc, dir).expect("couldn't update board");
            }
        });
    }

    let mut interval = None;

    add_event_listener(window, "keydown", move |e: web_sys::KeyboardEvent| {
        if let Ok(key) = Key::try_from(e.key_code()) {
            e.prevent_default();

            let bc = Rc::clone(&board);
            match key {
                Key::Direction(dir) => {
                    request_animation_frame(move || {
                        play(&bc, dir).expect("couldn't update board");
                    });
                }
                Key::Restart => restart(&bc).expect("couldn't restart game"),
                Key::ToggleMachinePlay => {
                    if let Some(handle) = interval {
                        interval = None;
                        return clear_interval(handle);
                    }
                    interval = Some(set_interval(
                        move || {
                            let best = bc
                                .borrow_mut()
                                .best_move_now()
                                .expect("couldn't run AI search");
                            if let Some(dir) = best {
                                let bc = Rc::clone(&bc);
                                request_animation_frame(move || {
                                    play(&bc, dir).expect("couldn't update board");
                                });
                            }
                        },
                        AUTO_PLAY_MS,
                    ));
                }
            }
        }
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_direction() {
        for (dx, dy, answer) in vec![
            (0, 0, None),
            (30, 0, None),
            (-12, 25, None),
            (31, 0, Some(Direction::Right)),
            (-80, 40, Some(Direction::Left)),
            (10, 45, Some(Direction::Down)),
            (-20, -90, Some(Direction::Up)),
            (50, 50, Some(Direction::Down)),
        ] {
            assert_eq!(swipe_direction(dx, dy), answer, "({}, {})", dx, dy);
        }
    }

    #[test]
    fn test_key_codes() {
        for (code, answer) in vec![
            (38, Some(Direction::Up)),
            (72, Some(Direction::Left)),
            (40, Some(Direction::Down)),
            (76, Some(Direction::Right)),
        ] {
            match Key::try_from(code) {
                Ok(Key::Direction(dir)) => assert_eq!(Some(dir), answer),
                _ => panic!("code {} is not a direction", code),
            }
        }
        assert!(matches!(Key::try_from(80), Ok(Key::ToggleMachinePlay)));
        assert!(matches!(Key::try_from(82), Ok(Key::Restart)));
    }
}
