//! Replays a recorded access log against a Matomo tracker in (shifted) real time.
//!
//! [`replay::ReplayScheduler`] does the pacing; [`cli::run::drive`] is the
//! loop that ticks it and sleeps in between.

pub mod cli;
pub mod config;
pub mod replay;
pub mod source;
pub mod tracking;
