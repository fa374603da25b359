use anyhow::{Context, Result};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Country facet selected at start; absent means the wildcard.
    #[serde(default)]
    pub initial_country: Option<String>,
    /// Mirror host (or full base URL) to use instead of discovery.
    #[serde(default)]
    pub server: Option<String>,
    /// Mirror that served the last successful search.
    #[serde(default)]
    pub last_server: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read config: {path:?}")),
        };
        let text = String::from_utf8_lossy(&bytes);
        toml::from_str(&text).with_context(|| format!("Invalid config TOML: {path:?}"))
    }

    pub fn save_atomic(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("Config path has no parent")?;
        ensure_private_dir(parent)?;
        let data = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        let tmp = parent.join(format!(
            ".{}.tmp.{suffix}",
            path.file_name()
                .and_then(|s| s.to_str())
                .unwrap_or("config.toml")
        ));

        {
            let mut file = fs::File::create(&tmp).with_context(|| format!("Create temp file: {tmp:?}"))?;
            file.write_all(data.as_bytes())
                .with_context(|| format!("Write temp file: {tmp:?}"))?;
            file.sync_all()
                .with_context(|| format!("Sync temp file: {tmp:?}"))?;
        }

        fs::rename(&tmp, path).with_context(|| format!("Atomic rename to: {path:?}"))?;

        let dir_file = fs::File::open(parent).with_context(|| format!("Open config dir: {parent:?}"))?;
        let _ = dir_file.sync_all();

        Ok(())
    }

    /// Records the mirror that served a search. Returns true when it changed.
    pub fn remember_server(&mut self, server: &str) -> bool {
        if self.last_server.as_deref() == Some(server) {
            return false;
        }
        self.last_server = Some(server.to_string());
        true
    }
}

fn config_path() -> Result<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })
        .context("Could not determine XDG config directory")?;
    Ok(base.join("stationfinder").join("config.toml"))
}

fn ensure_private_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::create_dir_all(path).with_context(|| format!("Create config dir: {path:?}"))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Set permissions on config dir: {path:?}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        std::env::temp_dir().join(format!("stationfinder-{name}-{suffix}"))
    }

    #[test]
    fn missing_file_is_default() {
        let cfg = AppConfig::load_from(&scratch_dir("missing").join("config.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: AppConfig = toml::from_str(r#"initial_country = "France""#).unwrap();
        assert_eq!(cfg.initial_country.as_deref(), Some("France"));
        assert_eq!(cfg.server, None);
    }

    #[test]
    fn rejects_invalid_toml() {
        let dir = scratch_dir("invalid");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "initial_country = [").unwrap();
        assert!(AppConfig::load_from(&path).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn save_round_trips_through_rename() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        assert!(cfg.remember_server("de1.api.radio-browser.info"));
        assert!(!cfg.remember_server("de1.api.radio-browser.info"));
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded, cfg);
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
        fs::remove_dir_all(&dir).unwrap();
    }
}
