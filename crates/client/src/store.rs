//! Local ledger snapshot and genesis config files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use auction_module::{GenesisValidationError, MemoryLedger, ModuleGenesisConfig};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid genesis config: {0}")]
    Genesis(#[from] GenesisValidationError),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_error(path: &Path) -> impl FnOnce(serde_json::Error) -> StoreError + '_ {
    move |source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a ledger snapshot; a missing file is an empty ledger.
pub fn load_ledger(path: &Path) -> Result<MemoryLedger, StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "No ledger snapshot, starting empty");
        return Ok(MemoryLedger::new());
    }
    let data = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&data).map_err(json_error(path))
}

/// Write a ledger snapshot, replacing the previous one in a single rename.
pub fn save_ledger(path: &Path, ledger: &MemoryLedger) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let data = serde_json::to_string_pretty(ledger).map_err(json_error(path))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data).map_err(io_error(&tmp))?;
    fs::rename(&tmp, path).map_err(io_error(path))?;
    debug!(path = %path.display(), height = ledger.height(), "Ledger snapshot saved");
    Ok(())
}

/// Load and validate a genesis config, or the default when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ModuleGenesisConfig, StoreError> {
    let config = match path {
        Some(path) => {
            let data = fs::read_to_string(path).map_err(io_error(path))?;
            serde_json::from_str(&data).map_err(json_error(path))?
        }
        None => ModuleGenesisConfig::default(),
    };
    config.validate()?;
    Ok(config)
}
