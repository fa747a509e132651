use std::fs;
use std::path::Path;

use crate::config::validator::validate;
use crate::config::Config;
use crate::error::{EdgeprintError, Result};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| EdgeprintError::Config(format!("Failed to read config file: {e}")))?;
    from_toml_str(&txt)
}

pub fn from_toml_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| EdgeprintError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg).map_err(EdgeprintError::Config)?;

    Ok(cfg)
}
