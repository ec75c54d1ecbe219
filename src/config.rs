//! Settings for locating a schema and choosing the index layout.
//!
//! Values come from an optional settings file (any format the `config` crate
//! recognises from the extension) and are overridden by `FIELDRULES_*`
//! environment variables, e.g. `FIELDRULES_SCHEMA_PATH`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::index::CURRENT_FORMAT_VERSION;

fn default_format_version() -> u32 {
    CURRENT_FORMAT_VERSION
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub schema_path: PathBuf,
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

impl Settings {
    pub fn new<P: Into<PathBuf>>(schema_path: P) -> Self {
        Self {
            schema_path: schema_path.into(),
            format_version: CURRENT_FORMAT_VERSION,
        }
    }
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("FIELDRULES"))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
