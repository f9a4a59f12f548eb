use std::path::PathBuf;

use anyhow::Context;

use synapse_sync::SyncConfig;
use synapse_types::{DEFAULT_ACCESS_CODE, DEFAULT_ANONYMOUS_DISPLAY_NAME, MAX_MESSAGE_LENGTH};

pub struct Config {
    pub db_path: PathBuf,
    pub sync: SyncConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let db_path = std::env::var("SYNAPSE_DB_PATH").unwrap_or_else(|_| "synapse.db".into());
        let access_code =
            std::env::var("SYNAPSE_ACCESS_CODE").unwrap_or_else(|_| DEFAULT_ACCESS_CODE.into());
        let display_name = std::env::var("SYNAPSE_DISPLAY_NAME")
            .unwrap_or_else(|_| DEFAULT_ANONYMOUS_DISPLAY_NAME.into());
        let max_message_length = match std::env::var("SYNAPSE_MAX_MESSAGE_LENGTH") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("invalid SYNAPSE_MAX_MESSAGE_LENGTH '{}'", raw))?,
            Err(_) => MAX_MESSAGE_LENGTH,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            sync: SyncConfig {
                access_code,
                max_message_length,
                display_name,
            },
        })
    }
}
