use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

pub const APPLICATION_NAME: &str = "whatdoing";
pub const SCHEMA_FILE: &str = "schema.json";
pub const DATA_FILE: &str = "data.csv";
pub const LOG_DIR: &str = "logs";

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn state_base_dir() -> Result<PathBuf> {
            env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))
        }
    } else {
        fn state_base_dir() -> Result<PathBuf> {
            env::var("XDG_STATE_HOME")
                .map(PathBuf::from)
                .or_else(|_| env::var("HOME").map(|home| PathBuf::from(home).join(".local/state")))
                .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
        }
    }
}

/// Directory that holds the schema, the data log and logs. Uses `%APPDATA%` on Windows and
/// `$XDG_STATE_HOME` or `$HOME/.local/state` elsewhere.
pub fn create_application_default_path() -> Result<PathBuf> {
    ensure_dir(state_base_dir()?.join(APPLICATION_NAME))
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::ensure_dir;

    #[test]
    fn test_ensure_dir_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("a").join("b");
        assert_eq!(ensure_dir(nested.clone())?, nested);
        assert_eq!(ensure_dir(nested.clone())?, nested);
        assert!(nested.is_dir());
        Ok(())
    }
}
