use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeatmapError {
    #[error("invalid date token {0:?}, expected M/D/YY")]
    InvalidDate(String),
    #[error("incorrect password")]
    Unauthorized,
    #[error("date {0:?} is not among the selectable dates")]
    UnknownDate(String),
    #[error("{0:?} is not on the roster")]
    UnknownParticipant(String),
    #[error("malformed override {0:?}, expected <date>=<Name>[,<Name>...]")]
    MalformedOverride(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("no dates selected")]
    EmptySelection,
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}
