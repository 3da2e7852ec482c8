//! Daily challenge selection.
//!
//! This module owns:
//!   - the challenge store (one row per calendar date)
//!   - the selection cycle state (cycle number + codes used this cycle)
//!   - the injected RNG driving the uniform pick
//!
//! `resolve(date)` is idempotent and safe under concurrent callers: the
//! challenge-store insert is an atomic create-if-absent, so racing resolvers
//! for the same unseen date converge on a single winner and the loser
//! discards its own pick. Within one cycle no country repeats; a new cycle
//! starts only once every country has been used.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::{category, format, DailyChallenge};
use crate::error::EngineError;
use crate::questions::QuestionService;
use crate::store::KvStore;

const SELECTION_ALGORITHM: &str = "v1_random";

struct SelectionState {
    cycle: u32,
    used: HashSet<String>,
}

pub struct DailySelector {
    catalog: Arc<Catalog>,
    questions: Arc<QuestionService>,
    challenges: KvStore<NaiveDate, DailyChallenge>,
    selection: Mutex<SelectionState>,
    rng: Mutex<StdRng>,
}

impl DailySelector {
    /// The RNG is injected so selection is reproducible under test;
    /// production seeds from entropy (see `AppState::new`).
    pub fn with_rng(
        catalog: Arc<Catalog>,
        questions: Arc<QuestionService>,
        op_timeout: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            catalog,
            questions,
            challenges: KvStore::new(op_timeout),
            selection: Mutex::new(SelectionState { cycle: 1, used: HashSet::new() }),
            rng: Mutex::new(rng),
        }
    }

    /// Get the challenge for `date`, creating it if this is the first call.
    #[instrument(level = "info", skip(self), fields(%date))]
    pub async fn resolve(&self, date: NaiveDate) -> Result<DailyChallenge, EngineError> {
        if let Some(existing) = self.challenges.read(&date).await? {
            return Ok(existing.record);
        }

        // One picker at a time: the cycle bookkeeping and the insert must
        // agree, and a pick is only marked used once its row wins.
        let mut selection = self.selection.lock().await;

        if let Some(existing) = self.challenges.read(&date).await? {
            return Ok(existing.record);
        }

        if self.catalog.is_empty() {
            return Err(EngineError::NoEligibleEntities);
        }

        let mut eligible: Vec<&String> = self
            .catalog
            .codes()
            .iter()
            .filter(|code| !selection.used.contains(*code))
            .collect();

        if eligible.is_empty() {
            // Every country has been shown: start the next cycle.
            selection.cycle += 1;
            selection.used.clear();
            eligible = self.catalog.codes().iter().collect();
            info!(target: "challenge", cycle = selection.cycle, "Catalog exhausted; starting new selection cycle");
        }

        let mut rng = self.rng.lock().await;
        let code = (*eligible.choose(&mut *rng).ok_or(EngineError::NoEligibleEntities)?).clone();
        let country = self.catalog.get(&code).ok_or(EngineError::NoEligibleEntities)?;

        // The daily pairing: flag recognition, text input.
        let question = self.questions.define(country, category::FLAG, format::TEXT, &mut rng)?;
        drop(rng);

        let challenge = DailyChallenge {
            id: Uuid::new_v4().to_string(),
            date,
            country_code: code.clone(),
            question,
            cycle: selection.cycle,
            selection_algorithm: SELECTION_ALGORITHM.into(),
        };

        let (row, created) = self.challenges.create_if_absent(date, challenge).await?;
        if created {
            selection.used.insert(code);
            info!(target: "challenge", %date, country = %row.record.country_code, cycle = row.record.cycle, "Created daily challenge");
        }
        Ok(row.record)
    }

    /// All challenges strictly before `date`, newest first.
    pub async fn resolved_before(&self, date: NaiveDate) -> Result<Vec<DailyChallenge>, EngineError> {
        let mut rows: Vec<DailyChallenge> = self
            .challenges
            .scan()
            .await?
            .into_iter()
            .filter_map(|(d, c)| (d < date).then_some(c))
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Country;
    use crate::seeds::seed_countries;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn minimal_country(code: &str, name: &str) -> Country {
        Country {
            code: code.into(),
            name: name.into(),
            alternates: vec![],
            flag_emoji: String::new(),
            flag_svg_url: String::new(),
            flag_png_url: String::new(),
            flag_alt_text: String::new(),
            capital: String::new(),
            largest_city: String::new(),
            population: 0,
            languages: vec![],
            currency: String::new(),
            extra: HashMap::new(),
        }
    }

    fn selector_for(countries: Vec<Country>, seed: u64) -> Arc<DailySelector> {
        let catalog = Arc::new(Catalog::from_countries(countries));
        let questions = Arc::new(QuestionService::new(catalog.clone()));
        Arc::new(DailySelector::with_rng(
            catalog,
            questions,
            Duration::from_millis(500),
            StdRng::seed_from_u64(seed),
        ))
    }

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).expect("date") + chrono::Duration::days(i64::from(n))
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let sel = selector_for(seed_countries(), 1);
        let a = sel.resolve(day(0)).await.expect("resolve");
        let b = sel.resolve(day(0)).await.expect("resolve");
        assert_eq!(a.id, b.id);
        assert_eq!(a.country_code, b.country_code);
    }

    #[tokio::test]
    async fn concurrent_resolvers_converge_on_one_winner() {
        let sel = selector_for(seed_countries(), 2);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sel = sel.clone();
            handles.push(tokio::spawn(async move { sel.resolve(day(0)).await }));
        }
        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.expect("join").expect("resolve").id);
        }
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn no_repeats_within_a_cycle_and_reshuffle_after() {
        let countries: Vec<Country> = ["AAA", "BBB", "CCC"]
            .iter()
            .map(|c| minimal_country(c, c))
            .collect();
        let sel = selector_for(countries, 3);

        let mut picks = Vec::new();
        for n in 0..9 {
            picks.push(sel.resolve(day(n)).await.expect("resolve"));
        }

        for window in picks.chunks(3) {
            let codes: HashSet<&str> = window.iter().map(|c| c.country_code.as_str()).collect();
            assert_eq!(codes.len(), 3, "every country exactly once per cycle");
        }
        let cycles: Vec<u32> = picks.iter().map(|c| c.cycle).collect();
        assert_eq!(cycles, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[tokio::test]
    async fn two_country_catalog_repeats_only_after_exhaustion() {
        let sel = selector_for(vec![minimal_country("AAA", "Aland"), minimal_country("BBB", "Borduria")], 4);
        let d1 = sel.resolve(day(0)).await.expect("resolve");
        let d2 = sel.resolve(day(1)).await.expect("resolve");
        assert_ne!(d1.country_code, d2.country_code);

        let d3 = sel.resolve(day(2)).await.expect("resolve");
        assert!(d3.country_code == d1.country_code || d3.country_code == d2.country_code);
        assert_eq!(d3.cycle, 2);
    }

    #[tokio::test]
    async fn empty_catalog_is_fatal() {
        let sel = selector_for(vec![], 5);
        let err = sel.resolve(day(0)).await.expect_err("no countries");
        assert_eq!(err, EngineError::NoEligibleEntities);
    }

    #[tokio::test]
    async fn history_excludes_the_given_date_and_sorts_desc() {
        let sel = selector_for(seed_countries(), 6);
        for n in 0..4 {
            sel.resolve(day(n)).await.expect("resolve");
        }
        let history = sel.resolved_before(day(3)).await.expect("history");
        let dates: Vec<NaiveDate> = history.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![day(2), day(1), day(0)]);
    }
}
