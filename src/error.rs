use thiserror::Error;

/// Malformed input handed to the engine by the host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown direction token '{0}'")]
    Direction(String),
    #[error("grid must hold {expected} cells, got {actual}")]
    GridSize { expected: usize, actual: usize },
    #[error("tile value {value} at ({row}, {col}) is not a reachable tile")]
    TileValue { row: usize, col: usize, value: u32 },
    #[error("search needs at least one chance sample per turn")]
    ChanceSamples,
}

impl From<Error> for wasm_bindgen::JsValue {
    fn from(err: Error) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
