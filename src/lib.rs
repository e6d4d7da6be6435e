//! Regional weather alerts fetched through unreliable relays.
//!
//! See [`alerts`] for the pipeline and [`config`] for the TOML settings the
//! `skywarn` binary reads.

pub mod alerts;
pub mod config;
pub mod util;
