//! Service configuration.
//!
//! Loaded in priority order:
//! 1. `STRATA_`-prefixed environment variables (highest)
//! 2. `strata.toml` in the working directory, if present
//! 3. Built-in defaults (lowest)

use std::net::SocketAddr;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::DEFAULT_BODY_LIMIT;

const CONFIG_FILE: &str = "strata.toml";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Address the server binds to.
    ///
    /// Environment variable: `STRATA_BIND_ADDR`
    pub bind_addr: SocketAddr,

    /// Fallback `tracing` filter used when `RUST_LOG` is unset.
    ///
    /// Environment variable: `STRATA_LOG_FILTER`
    pub log_filter: String,

    /// Directory of the rolling `WARN`-and-above log file.
    ///
    /// Environment variable: `STRATA_LOG_DIR`
    pub log_dir: PathBuf,

    /// Largest request body the server buffers; larger ones get `413`.
    ///
    /// Environment variable: `STRATA_MAX_BODY_BYTES`
    pub max_body_bytes: usize,

    /// Seed the repository with its default item on startup.
    ///
    /// Environment variable: `STRATA_SEED`
    pub seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_filter: "info,strata=debug".to_owned(),
            log_dir: PathBuf::from("logs"),
            max_body_bytes: DEFAULT_BODY_LIMIT,
            seed: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("STRATA_"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, Error> {
        Ok(figment.extract()?)
    }
}
