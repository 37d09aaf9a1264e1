use std::fs::File;
use std::io::{Write, BufRead, BufReader};
use std::path::{Path, PathBuf};
use anyhow::{Result, Context, anyhow};
use tracing::info;

use crate::database::pool::DEFAULT_POOL_SIZE;
use crate::database::query::MatchMode;

pub const ENV_FILE: &str = ".env";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub image_dir: PathBuf,
    pub match_mode: MatchMode,
    pub pool_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("db/mercari.sqlite3"),
            image_dir: PathBuf::from("images"),
            match_mode: MatchMode::Exact,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Defaults, overlaid with the `.env` file when one exists.
pub fn load_settings(env_path: &Path) -> Result<Settings> {
    let mut settings = Settings::default();

    if env_path.exists() {
        load_from_env(env_path, &mut settings)
            .with_context(|| format!("Failed to load settings from {:?}", env_path))?;
        info!("Loaded settings from {:?}", env_path);
    }

    Ok(settings)
}

fn load_from_env(path: &Path, settings: &mut Settings) -> Result<()> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "MARKET_DB_PATH" => settings.db_path = PathBuf::from(value),
                "MARKET_IMAGE_DIR" => settings.image_dir = PathBuf::from(value),
                "MARKET_SEARCH_MATCH" => {
                    settings.match_mode = value.parse::<MatchMode>().map_err(|e: String| anyhow!(e))?
                }
                "MARKET_POOL_SIZE" => {
                    let size: u32 = value
                        .parse()
                        .with_context(|| format!("Invalid MARKET_POOL_SIZE '{}'", value))?;
                    if size == 0 {
                        return Err(anyhow!("MARKET_POOL_SIZE must be at least 1"));
                    }
                    settings.pool_size = size;
                }
                _ => {}
            }
        }
    }

    Ok(())
}

pub fn save_to_env(path: &Path, settings: &Settings) -> Result<()> {
    let mut file = File::create(path).context("Failed to create .env file")?;
    writeln!(file, "MARKET_DB_PATH={}", settings.db_path.display())?;
    writeln!(file, "MARKET_IMAGE_DIR={}", settings.image_dir.display())?;
    writeln!(file, "MARKET_SEARCH_MATCH={}", settings.match_mode)?;
    writeln!(file, "MARKET_POOL_SIZE={}", settings.pool_size)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_save_and_load_env() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(ENV_FILE);
        let settings = Settings {
            db_path: PathBuf::from("/tmp/market.sqlite3"),
            image_dir: PathBuf::from("/tmp/images"),
            match_mode: MatchMode::Substring,
            pool_size: 8,
        };

        save_to_env(&path, &settings)?;

        let content = fs::read_to_string(&path)?;
        assert!(content.contains("MARKET_DB_PATH=/tmp/market.sqlite3"));
        assert!(content.contains("MARKET_SEARCH_MATCH=substring"));

        let loaded = load_settings(&path)?;
        assert_eq!(loaded, settings);
        Ok(())
    }

    #[test]
    fn test_missing_env_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let loaded = load_settings(&dir.path().join(ENV_FILE))?;
        assert_eq!(loaded, Settings::default());
        assert_eq!(loaded.match_mode, MatchMode::Exact);
        Ok(())
    }

    #[test]
    fn test_partial_env_keeps_other_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(ENV_FILE);
        fs::write(&path, "# local overrides\nMARKET_IMAGE_DIR = uploads\nOTHER=ignored\n")?;

        let loaded = load_settings(&path)?;
        assert_eq!(loaded.image_dir, PathBuf::from("uploads"));
        assert_eq!(loaded.db_path, Settings::default().db_path);
        Ok(())
    }

    #[test]
    fn test_invalid_values_are_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(ENV_FILE);

        fs::write(&path, "MARKET_SEARCH_MATCH=fuzzy\n")?;
        assert!(load_settings(&path).is_err());

        fs::write(&path, "MARKET_POOL_SIZE=0\n")?;
        assert!(load_settings(&path).is_err());
        Ok(())
    }
}
