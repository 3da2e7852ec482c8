//! Core behaviors shared by the HTTP handlers.
//!
//! This is the engine surface:
//!   - GetTodaysChallenge: resolve the day's challenge, merge the caller's
//!     attempt state (read-only; no ledger row is created here)
//!   - SubmitAnswer: run the attempt state machine, reveal the canonical
//!     answer only on a terminal outcome
//!   - GetStats / history projections

use chrono::NaiveDate;
use tracing::instrument;

use crate::domain::{LedgerState, SubmittedAnswer};
use crate::error::EngineError;
use crate::protocol::{
  country_detail_out, country_list_out, daily_status_out, stats_out, CountryDetailOut,
  CountryListOut, DailyStatusOut, HistoryItemOut, StatsOut, SubmitOut,
};
use crate::state::AppState;

#[instrument(level = "info", skip(state), fields(%user_id, %date))]
pub async fn get_todays_challenge(
  state: &AppState,
  user_id: &str,
  date: NaiveDate,
) -> Result<DailyStatusOut, EngineError> {
  let challenge = state.selector.resolve(date).await?;
  let country = state.catalog.get(&challenge.country_code).ok_or(EngineError::NoEligibleEntities)?;
  let ledger = state.ledgers.get(user_id, &challenge.id).await?;
  Ok(daily_status_out(&challenge, country, ledger.as_ref()))
}

#[instrument(level = "info", skip(state, answer), fields(%user_id, %date))]
pub async fn submit_answer(
  state: &AppState,
  user_id: &str,
  date: NaiveDate,
  answer: SubmittedAnswer,
  time_taken_seconds: Option<u32>,
) -> Result<SubmitOut, EngineError> {
  let challenge = state.selector.resolve(date).await?;
  let outcome = state
    .ledgers
    .submit(user_id, &challenge, answer, time_taken_seconds, &state.questions, &state.stats)
    .await?;

  let terminal = outcome.ledger.state.is_terminal();
  Ok(SubmitOut {
    is_correct: outcome.is_correct,
    explanation: outcome.explanation,
    attempts_remaining: crate::ledger::attempts_remaining(&outcome.ledger),
    state: outcome.ledger.state,
    canonical_answer: terminal.then(|| challenge.question.canonical_answer.clone()),
  })
}

#[instrument(level = "info", skip(state), fields(%user_id))]
pub async fn get_stats(state: &AppState, user_id: &str) -> Result<StatsOut, EngineError> {
  let stats = state.stats.get(user_id).await?;
  Ok(stats_out(&stats))
}

/// Past challenges (strictly before `today`), newest first, joined with the
/// caller's result. Yesterday's answers are public: those rounds are locked.
#[instrument(level = "info", skip(state), fields(%user_id, %today))]
pub async fn get_history(
  state: &AppState,
  user_id: &str,
  today: NaiveDate,
) -> Result<Vec<HistoryItemOut>, EngineError> {
  let mut items = Vec::new();
  for challenge in state.selector.resolved_before(today).await? {
    let country = state.catalog.get(&challenge.country_code).ok_or(EngineError::NoEligibleEntities)?;
    let ledger = state.ledgers.get(user_id, &challenge.id).await?;
    let (solved, attempts_used) = match &ledger {
      Some(l) => (
        match l.state {
          LedgerState::Solved => Some(true),
          LedgerState::Exhausted => Some(false),
          LedgerState::Open => None,
        },
        l.attempts.len(),
      ),
      None => (None, 0),
    };
    items.push(HistoryItemOut {
      date: challenge.date,
      country_code: country.code.clone(),
      country_name: country.name.clone(),
      flag_emoji: country.flag_emoji.clone(),
      solved,
      attempts_used,
    });
  }
  Ok(items)
}

pub fn list_countries(state: &AppState) -> Vec<CountryListOut> {
  state.catalog.iter().map(country_list_out).collect()
}

pub fn get_country(state: &AppState, code: &str) -> Option<CountryDetailOut> {
  state.catalog.get(code).map(country_detail_out)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::Catalog;
  use crate::clock::FixedClock;
  use crate::config::EngineCfg;
  use crate::seeds::seed_countries;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use std::sync::Arc;

  fn app(seed: u64) -> AppState {
    let catalog = Arc::new(Catalog::from_countries(seed_countries()));
    AppState::assemble(
      catalog,
      EngineCfg::default(),
      Arc::new(FixedClock(day(0))),
      StdRng::seed_from_u64(seed),
    )
  }

  fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 7, 1).expect("date") + chrono::Duration::days(i64::from(n))
  }

  fn text(s: &str) -> SubmittedAnswer {
    SubmittedAnswer::Text { text: s.into() }
  }

  async fn answer_for(state: &AppState, n: u32) -> String {
    let challenge = state.selector.resolve(day(n)).await.expect("resolve");
    state.catalog.get(&challenge.country_code).expect("country").name.clone()
  }

  #[tokio::test]
  async fn todays_challenge_withholds_the_canonical_answer() {
    let state = app(11);
    let name = answer_for(&state, 0).await;

    let out = get_todays_challenge(&state, "u1", day(0)).await.expect("status");
    assert_eq!(out.attempts_used, 0);
    assert_eq!(out.attempts_remaining, 3);
    assert_eq!(out.state, LedgerState::Open);

    let json = serde_json::to_string(&out).expect("json");
    assert!(!json.contains(&name), "response must not name the answer country");
    assert!(!json.contains("canonical_answer"));
  }

  #[tokio::test]
  async fn viewing_the_challenge_creates_no_ledger_row() {
    let state = app(12);
    get_todays_challenge(&state, "u1", day(0)).await.expect("status");
    let challenge = state.selector.resolve(day(0)).await.expect("resolve");
    assert!(state.ledgers.get("u1", &challenge.id).await.expect("store").is_none());
  }

  #[tokio::test]
  async fn wrong_answers_stay_sealed_until_terminal() {
    let state = app(13);
    let name = answer_for(&state, 0).await;

    let first = submit_answer(&state, "u1", day(0), text("atlantis"), None).await.expect("submit");
    assert!(!first.is_correct);
    assert_eq!(first.state, LedgerState::Open);
    assert_eq!(first.attempts_remaining, 2);
    assert!(first.canonical_answer.is_none());
    assert!(!first.explanation.contains(&name));

    submit_answer(&state, "u1", day(0), text("mu"), None).await.expect("submit");
    let third = submit_answer(&state, "u1", day(0), text("lemuria"), None).await.expect("submit");
    assert_eq!(third.state, LedgerState::Exhausted);
    assert!(third.canonical_answer.is_some(), "terminal response reveals the answer");

    let stats = get_stats(&state, "u1").await.expect("stats");
    assert_eq!(stats.missed_entities.len(), 1);
  }

  #[tokio::test]
  async fn solving_on_the_second_attempt() {
    let state = app(14);
    let name = answer_for(&state, 0).await;

    submit_answer(&state, "u1", day(0), text("amsterdam"), None).await.expect("submit");
    let out = submit_answer(&state, "u1", day(0), text(&name), None).await.expect("submit");
    assert!(out.is_correct);
    assert_eq!(out.state, LedgerState::Solved);
    assert_eq!(out.attempts_remaining, 1);
    assert!(out.canonical_answer.is_some());

    let err = submit_answer(&state, "u1", day(0), text(&name), None).await.expect_err("locked");
    assert_eq!(err, EngineError::ChallengeAlreadyResolved);
  }

  #[tokio::test]
  async fn back_to_back_wins_build_a_streak() {
    let state = app(15);
    for n in 0..2 {
      let name = answer_for(&state, n).await;
      submit_answer(&state, "u1", day(n), text(&name), None).await.expect("submit");
    }
    let stats = get_stats(&state, "u1").await.expect("stats");
    assert_eq!(stats.current_streak, 2);
    assert_eq!(stats.total_correct, 2);
    let flag = stats.category_breakdown.get("flag").expect("flag entry");
    assert!((flag.accuracy - 1.0).abs() < f64::EPSILON);
  }

  #[tokio::test]
  async fn history_lists_locked_rounds_newest_first() {
    let state = app(16);
    let name = answer_for(&state, 0).await;
    submit_answer(&state, "u1", day(0), text(&name), None).await.expect("submit");
    state.selector.resolve(day(1)).await.expect("resolve");

    let history = get_history(&state, "u1", day(1)).await.expect("history");
    assert_eq!(history.len(), 1, "today is excluded");
    assert_eq!(history[0].date, day(0));
    assert_eq!(history[0].solved, Some(true));
    assert_eq!(history[0].country_name, name, "locked rounds may name the country");
  }

  #[tokio::test]
  async fn catalog_projections_list_and_detail() {
    let state = app(17);
    let countries = list_countries(&state);
    assert_eq!(countries.len(), state.catalog.len());
    let detail = get_country(&state, "FRA").expect("detail");
    assert_eq!(detail.capital, "Paris");
    assert!(get_country(&state, "ZZZ").is_none());
  }
}
