use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::string::String;
use std::vec::Vec;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::isa::{Catalog, CatalogError, CatalogRecord};
use crate::sysreg::{RegisterDb, RegisterRecord, SysregError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: malformed JSON", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{}:{line}: malformed JSON record", path.display())]
    JsonLine {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid encoding catalog")]
    Catalog(#[from] CatalogError),
    #[error("invalid register database")]
    Registers(#[from] SysregError),
}

fn parse_records<T: DeserializeOwned>(path: &Path, text: &str) -> Result<Vec<T>, LoadError> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).map_err(|source| LoadError::Json { path: path.to_path_buf(), source });
    }

    let mut records = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .map_err(|source| LoadError::JsonLine { path: path.to_path_buf(), line: idx + 1, source })?;
        records.push(record);
    }
    Ok(records)
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    let text: String = fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    parse_records(path, &text)
}

pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Catalog, LoadError> {
    let path = path.as_ref();
    let records: Vec<CatalogRecord> = read_records(path)?;
    log::info!("loaded {} encoding records from {}", records.len(), path.display());
    Ok(Catalog::from_records(records)?)
}

pub fn load_registers<P: AsRef<Path>>(path: P) -> Result<RegisterDb, LoadError> {
    let path = path.as_ref();
    let records: Vec<RegisterRecord> = read_records(path)?;
    log::info!("loaded {} register records from {}", records.len(), path.display());
    Ok(RegisterDb::from_records(records)?)
}
