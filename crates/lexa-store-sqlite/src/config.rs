//! Store configuration, read from an optional TOML file and `LEXA_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use ::config::Map;
use serde::Deserialize;

use crate::Result;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

fn default_busy_timeout_ms() -> u64 { DEFAULT_BUSY_TIMEOUT_MS }

/// Runtime store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  /// Database file. `None` opens an in-memory database.
  #[serde(default)]
  pub path:            Option<PathBuf>,
  /// How long a writer waits on a locked database before failing.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { path: None, busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS }
  }
}

impl StoreConfig {
  /// Load from `file` (if given and present), then let `LEXA_PATH` and
  /// `LEXA_BUSY_TIMEOUT_MS` override it.
  pub fn load(file: Option<&Path>) -> Result<Self> { Self::load_from(file, None) }

  /// `env` replaces the process environment when given.
  fn load_from(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<Self> {
    let mut builder = ::config::Config::builder();
    if let Some(file) = file {
      builder =
        builder.add_source(::config::File::from(file.to_path_buf()).required(false));
    }
    let settings = builder
      .add_source(
        ::config::Environment::with_prefix("LEXA")
          .try_parsing(true)
          .source(env),
      )
      .build()?;

    Ok(settings.try_deserialize()?)
  }

  pub fn busy_timeout(&self) -> Duration {
    Duration::from_millis(self.busy_timeout_ms)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
    Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
  }

  #[test]
  fn defaults_without_sources() {
    let cfg = StoreConfig::load_from(None, env(&[])).unwrap();
    assert!(cfg.path.is_none());
    assert_eq!(cfg.busy_timeout_ms, 5_000);
    assert_eq!(cfg.busy_timeout(), Duration::from_secs(5));
  }

  #[test]
  fn reads_toml_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "path = \"/var/lib/lexa/lexa.db\"\nbusy_timeout_ms = 250")
      .unwrap();

    let cfg = StoreConfig::load_from(Some(file.path()), env(&[])).unwrap();
    assert_eq!(cfg.path, Some(PathBuf::from("/var/lib/lexa/lexa.db")));
    assert_eq!(cfg.busy_timeout(), Duration::from_millis(250));
  }

  #[test]
  fn environment_overrides_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "path = \"/var/lib/lexa/lexa.db\"\nbusy_timeout_ms = 250")
      .unwrap();

    let cfg = StoreConfig::load_from(
      Some(file.path()),
      env(&[("LEXA_PATH", "/srv/lexa.db"), ("LEXA_BUSY_TIMEOUT_MS", "750")]),
    )
    .unwrap();
    assert_eq!(cfg.path, Some(PathBuf::from("/srv/lexa.db")));
    assert_eq!(cfg.busy_timeout_ms, 750);
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg =
      StoreConfig::load_from(Some(Path::new("/nonexistent/lexa.toml")), env(&[]))
        .unwrap();
    assert!(cfg.path.is_none());
    assert_eq!(cfg.busy_timeout_ms, 5_000);
  }
}
