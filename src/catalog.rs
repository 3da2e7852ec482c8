//! Read-only country catalog.
//!
//! Built once at startup from the TOML config (if any) plus built-in seeds.
//! Seeds never overwrite a configured country with the same code. The engine
//! treats the resulting set as immutable reference data.

use std::collections::HashMap;

use tracing::{error, info};

use crate::config::CatalogConfig;
use crate::domain::Country;
use crate::seeds::seed_countries;

pub struct Catalog {
  by_code: HashMap<String, Country>,
  /// Codes in insertion order, for stable iteration and sampling.
  codes: Vec<String>,
}

impl Catalog {
  /// Build the catalog from config rows + seeds. Rows missing a code or
  /// name are skipped with an error log.
  pub fn from_config(cfg: Option<&CatalogConfig>) -> Self {
    let mut by_code = HashMap::<String, Country>::new();
    let mut codes = Vec::<String>::new();

    let mut configured = 0usize;
    if let Some(cfg) = cfg {
      for c in &cfg.countries {
        if c.code.trim().is_empty() || c.name.trim().is_empty() {
          error!(target: "flagday_backend", code = %c.code, name = %c.name, "Skipping catalog row: missing code or name.");
          continue;
        }
        if by_code.insert(c.code.clone(), c.clone()).is_none() {
          codes.push(c.code.clone());
          configured += 1;
        }
      }
    }

    // Always insert built-in seeds, but don't overwrite configured codes.
    let mut seeded = 0usize;
    for c in seed_countries() {
      if !by_code.contains_key(&c.code) {
        codes.push(c.code.clone());
        by_code.insert(c.code.clone(), c);
        seeded += 1;
      }
    }

    info!(target: "flagday_backend", configured, seeded, total = codes.len(), "Startup catalog inventory");
    Self { by_code, codes }
  }

  /// Build a catalog from explicit rows (tests, loaders).
  #[allow(dead_code)]
  pub fn from_countries(countries: Vec<Country>) -> Self {
    let mut by_code = HashMap::new();
    let mut codes = Vec::new();
    for c in countries {
      if !by_code.contains_key(&c.code) {
        codes.push(c.code.clone());
        by_code.insert(c.code.clone(), c);
      }
    }
    Self { by_code, codes }
  }

  pub fn get(&self, code: &str) -> Option<&Country> {
    self.by_code.get(code)
  }

  pub fn codes(&self) -> &[String] {
    &self.codes
  }

  pub fn iter(&self) -> impl Iterator<Item = &Country> {
    self.codes.iter().filter_map(|c| self.by_code.get(c))
  }

  pub fn len(&self) -> usize {
    self.codes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.codes.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::CatalogConfig;

  #[test]
  fn seeds_fill_in_when_no_config() {
    let cat = Catalog::from_config(None);
    assert!(!cat.is_empty());
    assert!(cat.get("FRA").is_some());
  }

  #[test]
  fn configured_rows_win_over_seeds() {
    let cfg: CatalogConfig = toml::from_str(
      r#"
      [[countries]]
      code = "FRA"
      name = "Republic of France"
      "#,
    )
    .expect("toml");
    let cat = Catalog::from_config(Some(&cfg));
    assert_eq!(cat.get("FRA").expect("fra").name, "Republic of France");
    // Seeds still supplement the rest.
    assert!(cat.get("JPN").is_some());
  }

  #[test]
  fn rows_without_code_are_skipped() {
    let cfg: CatalogConfig = toml::from_str(
      r#"
      [[countries]]
      code = ""
      name = "Nowhere"
      "#,
    )
    .expect("toml");
    let cat = Catalog::from_config(Some(&cfg));
    assert!(cat.iter().all(|c| !c.code.is_empty()));
  }
}
