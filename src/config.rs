//! Loading the country catalog and engine tuning from TOML.
//!
//! See `CatalogConfig` for the expected schema. The file path comes from
//! `CATALOG_CONFIG_PATH`; on any IO/parse error we log and fall back to the
//! built-in seed catalog.

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::Country;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CatalogConfig {
  #[serde(default)]
  pub countries: Vec<Country>,
  #[serde(default)]
  pub engine: EngineCfg,
}

/// Engine tuning knobs. Sensible without any file present: retries stay at
/// a small fixed bound and every store access has a deadline.
#[derive(Clone, Debug, Deserialize)]
pub struct EngineCfg {
  /// Deadline for a single store access, in milliseconds.
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms: u64,
  /// Optimistic-lock retries before surfacing a transient conflict.
  #[serde(default = "default_submit_retry_cap")]
  pub submit_retry_cap: u32,
  /// Day boundary: hours offset from UTC at which "today" rolls over.
  /// Default -5 keeps the original deployment's America/New_York reset.
  #[serde(default = "default_reset_utc_offset_hours")]
  pub reset_utc_offset_hours: i32,
}

fn default_store_timeout_ms() -> u64 { 2_000 }
fn default_submit_retry_cap() -> u32 { 4 }
fn default_reset_utc_offset_hours() -> i32 { -5 }

impl Default for EngineCfg {
  fn default() -> Self {
    Self {
      store_timeout_ms: default_store_timeout_ms(),
      submit_retry_cap: default_submit_retry_cap(),
      reset_utc_offset_hours: default_reset_utc_offset_hours(),
    }
  }
}

/// Attempt to load `CatalogConfig` from CATALOG_CONFIG_PATH.
/// On any parsing/IO error, returns None.
pub fn load_catalog_config_from_env() -> Option<CatalogConfig> {
  let path = std::env::var("CATALOG_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<CatalogConfig>(&s) {
      Ok(cfg) => {
        info!(target: "flagday_backend", %path, countries = cfg.countries.len(), "Loaded catalog config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "flagday_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "flagday_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_minimal_catalog_file() {
    let cfg: CatalogConfig = toml::from_str(
      r#"
      [engine]
      reset_utc_offset_hours = 0

      [[countries]]
      code = "FRA"
      name = "France"
      alternates = ["french republic"]
      capital = "Paris"
      "#,
    )
    .expect("toml");
    assert_eq!(cfg.countries.len(), 1);
    assert_eq!(cfg.countries[0].code, "FRA");
    assert_eq!(cfg.countries[0].capital, "Paris");
    assert_eq!(cfg.engine.reset_utc_offset_hours, 0);
    assert_eq!(cfg.engine.submit_retry_cap, 4);
  }

  #[test]
  fn defaults_apply_without_engine_section() {
    let cfg: CatalogConfig = toml::from_str("").expect("toml");
    assert!(cfg.countries.is_empty());
    assert_eq!(cfg.engine.store_timeout_ms, 2_000);
    assert_eq!(cfg.engine.reset_utc_offset_hours, -5);
  }
}
