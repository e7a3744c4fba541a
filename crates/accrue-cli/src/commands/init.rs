//! Init command implementation.

use crate::cli::InitArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

/// Write the default configuration to `path` (or the default path).
pub fn execute_init(args: &InitArgs, path: Option<&Path>) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_path()?,
    };

    if path.exists() && !args.force {
        return Err(CliError::Config(format!(
            "{} already exists; use --force to overwrite",
            path.display()
        )));
    }

    Config::default().save(&path)?;
    Ok(path)
}
