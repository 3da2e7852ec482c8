//! Application state: catalog, question service, selector, ledgers, stats,
//! and the injected clock.
//!
//! `AppState::new` builds everything from env + TOML config; `assemble` is
//! the seam tests use to pin the catalog, the clock, and the RNG seed.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::instrument;

use crate::catalog::Catalog;
use crate::clock::{Clock, ResetClock};
use crate::config::{load_catalog_config_from_env, EngineCfg};
use crate::ledger::AttemptLedgerStore;
use crate::questions::QuestionService;
use crate::selector::DailySelector;
use crate::stats::StatsStore;

pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub questions: Arc<QuestionService>,
    pub selector: DailySelector,
    pub ledgers: AttemptLedgerStore,
    pub stats: StatsStore,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build state from env: load the TOML catalog if provided, fall back
    /// to seeds, wire the production clock and an entropy-seeded RNG.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_catalog_config_from_env();
        let engine = cfg.as_ref().map(|c| c.engine.clone()).unwrap_or_default();
        let catalog = Arc::new(Catalog::from_config(cfg.as_ref()));
        let clock = Arc::new(ResetClock { utc_offset_hours: engine.reset_utc_offset_hours });
        Self::assemble(catalog, engine, clock, StdRng::from_entropy())
    }

    pub fn assemble(
        catalog: Arc<Catalog>,
        engine: EngineCfg,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let op_timeout = Duration::from_millis(engine.store_timeout_ms);
        let questions = Arc::new(QuestionService::new(catalog.clone()));
        let selector = DailySelector::with_rng(catalog.clone(), questions.clone(), op_timeout, rng);
        let ledgers = AttemptLedgerStore::new(op_timeout, engine.submit_retry_cap);
        let stats = StatsStore::new(op_timeout, engine.submit_retry_cap);
        Self { catalog, questions, selector, ledgers, stats, clock }
    }
}
