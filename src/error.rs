//! Error types surfaced to the acting participant.
//!
//! Every mutating operation rejects up front and leaves session state
//! untouched; none of these are retryable.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("session not found")]
    SessionNotFound,

    #[error("you are not part of this session")]
    UnknownParticipant,

    #[error("only the host can do that")]
    NotHost,

    #[error("the session has already started")]
    NotInLobby,

    #[error("the session is full")]
    SessionFull,

    #[error("need between {min} and {max} players to start")]
    NotEnoughPlayers { min: usize, max: usize },

    #[error("all players must be ready")]
    PlayersNotReady,

    #[error("not allowed in the current phase")]
    WrongPhase,

    #[error("a guess is required for every other player ({expected} expected, got {got})")]
    IncompleteGuessSet { expected: usize, got: usize },

    #[error("guess targets must cover every other player exactly once")]
    BadGuessTargets,

    #[error("your role cannot perform this action")]
    RoleCannot,

    #[error("the reveal window has closed")]
    RevealWindowClosed,

    #[error("you have already revealed yourself")]
    AlreadyRevealed,

    #[error("that mission was not issued to you or is already completed")]
    MissionNotIssued,

    #[error("could not allocate a unique join code")]
    CodesExhausted,

    #[error("the session is no longer running")]
    SessionClosed,
}

impl GameError {
    fn status(&self) -> StatusCode {
        match self {
            GameError::SessionNotFound => StatusCode::NOT_FOUND,
            GameError::CodesExhausted | GameError::SessionClosed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GameError::SessionFull | GameError::NotInLobby => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl ResponseError for GameError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
