use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vx_types::Genesis;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub data_dir: PathBuf,
    pub genesis: GenesisConfig,
}

/// Genesis description as written in the config file, hashes in hex.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub block: String,
    pub protocol: String,
    pub timestamp: i64,
}

impl GenesisConfig {
    pub fn to_genesis(&self) -> Result<Genesis> {
        Ok(Genesis {
            block: self.block.parse().context("parse genesis block hash")?,
            protocol: self
                .protocol
                .parse()
                .context("parse genesis protocol hash")?,
            timestamp: self.timestamp,
        })
    }
}
