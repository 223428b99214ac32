#![forbid(unsafe_code)]

//! Optional subscriber setup for hosts that do not configure `tracing`
//! themselves.
//!
//! The filter comes from `RUST_LOG` when set, otherwise `tourguide=info`.

use tracing_subscriber::EnvFilter;

use crate::error::{Result, TourError};

const DEFAULT_FILTER: &str = "tourguide=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable global subscriber.
pub fn init_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .try_init()
        .map_err(|err| TourError::Logging(err.to_string()))
}

/// Install a JSON-lines global subscriber.
pub fn init_json_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter())
        .try_init()
        .map_err(|err| TourError::Logging(err.to_string()))
}
