//! Public DTOs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.
//!
//! The canonical answer is a protected value: `QuestionOut` never carries
//! it, and `SubmitOut` only includes it once the caller's own ledger is
//! terminal. Country name/code stay server-side for the same reason: for
//! the daily flag category the name IS the answer.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    AttemptLedger, CanonicalAnswer, Country, DailyChallenge, LedgerState, SubmittedAnswer, UserStats,
};
use crate::ledger::{attempts_remaining, MAX_ATTEMPTS};

/// Question as shown to a user who may not have answered yet.
#[derive(Debug, Serialize)]
pub struct QuestionOut {
    pub id: String,
    pub category: String,
    pub format: String,
    pub prompt_text: String,
    pub flag_emoji: String,
    pub flag_svg_url: String,
    pub flag_png_url: String,
    pub flag_alt_text: String,
    /// Display metadata (e.g. shuffled options for multiple choice).
    pub metadata: HashMap<String, serde_json::Value>,
}

/// GET /api/v1/daily response: today's question plus the caller's ledger.
#[derive(Debug, Serialize)]
pub struct DailyStatusOut {
    pub challenge_id: String,
    pub date: NaiveDate,
    pub question: QuestionOut,
    pub attempts_used: usize,
    pub attempts_remaining: usize,
    pub state: LedgerState,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub answer_data: SubmittedAnswer,
    #[serde(default)]
    pub time_taken_seconds: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub is_correct: bool,
    pub explanation: String,
    pub attempts_remaining: usize,
    pub state: LedgerState,
    /// Revealed only once the ledger is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_answer: Option<CanonicalAnswer>,
}

#[derive(Debug, Serialize)]
pub struct BreakdownOut {
    pub correct: u32,
    pub total: u32,
    pub accuracy: f64,
}

#[derive(Debug, Serialize)]
pub struct StatsOut {
    pub total_correct: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_result_date: Option<NaiveDate>,
    pub category_breakdown: BTreeMap<String, BreakdownOut>,
    pub format_breakdown: BTreeMap<String, BreakdownOut>,
    pub missed_entities: Vec<String>,
}

/// One past challenge joined with the caller's result. Past answers are
/// public: the round locked at the end of that day.
#[derive(Debug, Serialize)]
pub struct HistoryItemOut {
    pub date: NaiveDate,
    pub country_code: String,
    pub country_name: String,
    pub flag_emoji: String,
    /// true = solved, false = exhausted, null = never played to the end.
    pub solved: Option<bool>,
    pub attempts_used: usize,
}

#[derive(Debug, Serialize)]
pub struct CountryListOut {
    pub code: String,
    pub name: String,
    pub flag_emoji: String,
    pub flag_png_url: String,
}

#[derive(Debug, Serialize)]
pub struct CountryDetailOut {
    pub code: String,
    pub name: String,
    pub flag_emoji: String,
    pub flag_svg_url: String,
    pub flag_png_url: String,
    pub flag_alt_text: String,
    pub capital: String,
    pub largest_city: String,
    pub population: u64,
    pub languages: Vec<String>,
    pub currency: String,
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Convert the internal question + its country's display assets to the
/// public DTO. The canonical answer and the country identity are dropped.
pub fn question_out(challenge: &DailyChallenge, country: &Country) -> QuestionOut {
    let q = &challenge.question;
    QuestionOut {
        id: q.id.clone(),
        category: q.category.clone(),
        format: q.format.clone(),
        prompt_text: q.prompt_text.clone(),
        flag_emoji: country.flag_emoji.clone(),
        flag_svg_url: country.flag_svg_url.clone(),
        flag_png_url: country.flag_png_url.clone(),
        flag_alt_text: country.flag_alt_text.clone(),
        metadata: q.metadata.clone(),
    }
}

pub fn daily_status_out(
    challenge: &DailyChallenge,
    country: &Country,
    ledger: Option<&AttemptLedger>,
) -> DailyStatusOut {
    let (attempts_used, remaining, state, last_attempt_at) = match ledger {
        Some(l) => (
            l.attempts.len(),
            attempts_remaining(l),
            l.state,
            l.attempts.last().map(|a| a.attempted_at),
        ),
        None => (0, MAX_ATTEMPTS, LedgerState::Open, None),
    };
    DailyStatusOut {
        challenge_id: challenge.id.clone(),
        date: challenge.date,
        question: question_out(challenge, country),
        attempts_used,
        attempts_remaining: remaining,
        state,
        last_attempt_at,
    }
}

pub fn stats_out(stats: &UserStats) -> StatsOut {
    let fold = |m: &BTreeMap<String, crate::domain::BreakdownEntry>| {
        m.iter()
            .map(|(k, e)| (k.clone(), BreakdownOut { correct: e.correct, total: e.total, accuracy: e.accuracy() }))
            .collect()
    };
    StatsOut {
        total_correct: stats.total_correct,
        current_streak: stats.current_streak,
        longest_streak: stats.longest_streak,
        last_result_date: stats.last_result_date,
        category_breakdown: fold(&stats.category_breakdown),
        format_breakdown: fold(&stats.format_breakdown),
        missed_entities: stats.missed_entities.clone(),
    }
}

pub fn country_list_out(c: &Country) -> CountryListOut {
    CountryListOut {
        code: c.code.clone(),
        name: c.name.clone(),
        flag_emoji: c.flag_emoji.clone(),
        flag_png_url: c.flag_png_url.clone(),
    }
}

pub fn country_detail_out(c: &Country) -> CountryDetailOut {
    CountryDetailOut {
        code: c.code.clone(),
        name: c.name.clone(),
        flag_emoji: c.flag_emoji.clone(),
        flag_svg_url: c.flag_svg_url.clone(),
        flag_png_url: c.flag_png_url.clone(),
        flag_alt_text: c.flag_alt_text.clone(),
        capital: c.capital.clone(),
        largest_city: c.largest_city.clone(),
        population: c.population,
        languages: c.languages.clone(),
        currency: c.currency.clone(),
        extra: c.extra.clone(),
    }
}
