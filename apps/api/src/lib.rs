//! Job-match scoring core.
//!
//! Scores how well a candidate profile fits a job listing, either with the
//! deterministic local matcher or with a user-selected AI provider, falling
//! back to the local score whenever the provider cannot answer. Per-user
//! provider keys are stored encrypted under a password-derived key.

pub mod config;
pub mod credentials;
pub mod db;
pub mod errors;
pub mod llm_client;
pub mod matching;
pub mod models;
pub mod routes;
pub mod state;
