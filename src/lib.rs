//! Among Legends: a social-deduction party game layered on top of real
//! League of Legends matches. This crate is the game-session server — the
//! lobby/phase state machine, collectors and the scoring engine, plus the
//! HTTP/WS surface that drives them.

pub mod config;
pub mod error;
pub mod game;
pub mod hub;
pub mod http;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod roles;
pub mod ws;
