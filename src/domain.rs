//! Domain models used by the backend: countries, questions, answer shapes,
//! the daily challenge row, the per-user attempt ledger, and user stats.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Question categories shipped with the engine. `Question::category` stays an
/// open string so new categories need no record change, only a builder.
pub mod category {
  pub const FLAG: &str = "flag";
  pub const CAPITAL: &str = "capital";
  pub const LARGEST_CITY: &str = "largest_city";
  pub const LANGUAGE: &str = "language";
  pub const CURRENCY: &str = "currency";
}

/// Answer formats with built-in validators. `Question::format` is an open
/// string; a format is usable once a validator is registered for it.
pub mod format {
  pub const TEXT: &str = "text";
  pub const MULTIPLE_CHOICE: &str = "multiple_choice";
  pub const BOOLEAN: &str = "boolean";
}

/// A country row from the catalog. Read-only reference data: loaded once at
/// startup, never mutated by the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Country {
  /// ISO 3166-1 alpha-3 style code (USA, FRA, JPN).
  pub code: String,
  pub name: String,
  /// Accepted alternate spellings of the name, matched case-insensitively.
  #[serde(default)] pub alternates: Vec<String>,

  // Display assets
  #[serde(default)] pub flag_emoji: String,
  #[serde(default)] pub flag_svg_url: String,
  #[serde(default)] pub flag_png_url: String,
  #[serde(default)] pub flag_alt_text: String,

  // Facts used by question builders
  #[serde(default)] pub capital: String,
  #[serde(default)] pub largest_city: String,
  #[serde(default)] pub population: u64,
  #[serde(default)] pub languages: Vec<String>,
  #[serde(default)] pub currency: String,

  /// Display-only attribute bag. Never load-bearing for engine logic.
  #[serde(default)] pub extra: HashMap<String, serde_json::Value>,
}

/// Canonical answer, shaped by the question format.
/// Serialized untagged so the wire shapes stay exactly:
/// `{answer, alternates}`, `{correct, options}`, `{answer: bool}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CanonicalAnswer {
  Boolean { answer: bool },
  Text {
    answer: String,
    #[serde(default)] alternates: Vec<String>,
  },
  Choice { correct: String, options: Vec<String> },
}

/// A user's submitted answer. Shapes mirror the question formats:
/// `{text}`, `{selected_option}`, `{answer: bool}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SubmittedAnswer {
  Boolean { answer: bool },
  Text { text: String },
  Choice { selected_option: String },
}

/// A question about one country. `category` and `format` are open strings;
/// the format must have a registered validator at validation time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  pub id: String,
  pub category: String,
  pub format: String,
  pub country_code: String,
  pub prompt_text: String,
  /// Protected value: never serialized into a response before the caller's
  /// own ledger is terminal.
  pub canonical_answer: CanonicalAnswer,
  /// Display-only metadata (e.g. shuffled options for multiple choice).
  #[serde(default)] pub metadata: HashMap<String, serde_json::Value>,
}

/// One calendar day's challenge. Singleton per date: all users see the same
/// country on the same date.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DailyChallenge {
  pub id: String,
  pub date: NaiveDate,
  pub country_code: String,
  pub question: Question,
  /// Selection cycle this row belongs to. Within one cycle no country
  /// repeats across challenge rows.
  pub cycle: u32,
  /// Which algorithm selected the country (versioned for later A/B tests).
  pub selection_algorithm: String,
}

/// Attempt ledger state. Terminal states are immutable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerState {
  Open,
  Solved,
  Exhausted,
}

impl LedgerState {
  pub fn is_terminal(self) -> bool {
    self != LedgerState::Open
  }
}

/// One recorded submission.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempt {
  pub answer: SubmittedAnswer,
  pub is_correct: bool,
  pub explanation: String,
  pub attempted_at: DateTime<Utc>,
  #[serde(default)] pub time_taken_seconds: Option<u32>,
}

/// Per (user, daily challenge) attempt record and state machine.
/// Created lazily on first submission; absence means zero attempts used.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttemptLedger {
  pub user_id: String,
  pub challenge_id: String,
  pub attempts: Vec<Attempt>,
  pub state: LedgerState,
}

impl AttemptLedger {
  pub fn new(user_id: String, challenge_id: String) -> Self {
    Self { user_id, challenge_id, attempts: Vec::new(), state: LedgerState::Open }
  }
}

/// Per-category or per-format tally. Accuracy is derived on read, never
/// stored, so the two can't drift.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct BreakdownEntry {
  pub correct: u32,
  pub total: u32,
}

impl BreakdownEntry {
  pub fn accuracy(&self) -> f64 {
    if self.total == 0 { 0.0 } else { f64::from(self.correct) / f64::from(self.total) }
  }
}

/// Per-user statistics, mutated only when a ledger terminates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserStats {
  pub total_correct: u32,
  pub current_streak: u32,
  pub longest_streak: u32,
  pub last_result_date: Option<NaiveDate>,
  pub category_breakdown: BTreeMap<String, BreakdownEntry>,
  pub format_breakdown: BTreeMap<String, BreakdownEntry>,
  /// Country codes the user exhausted all attempts on. Append-once.
  pub missed_entities: Vec<String>,
}
