use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid time of day `{0}`, expected HH:MM")]
    TimeOfDay(String),
    #[error("invalid instant `{0}`, expected YYYY-MM-DDTHH:MM")]
    Instant(String),
    #[error("invalid cancellation record `{0}`, expected dd.ORIG-DEST-HH:MM")]
    Cancellation(String),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("period {year}-{month:02} is not a valid calendar month")]
    InvalidPeriod { year: i32, month: u32 },
    #[error("scenario has no airports")]
    NoAirports,
}
