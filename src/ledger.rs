//! Per-user attempt ledgers for daily challenges.
//!
//! State machine per (user, challenge): OPEN → OPEN → OPEN → SOLVED or
//! EXHAUSTED, with SOLVED reachable from any attempt 1–3. Terminal ledgers
//! are immutable; a submission against one is rejected, never silently
//! accepted. Submissions are serialized per key with an optimistic version
//! check and a bounded retry loop, so a user can never exceed three attempts
//! and the stats hook fires exactly once per termination.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::domain::{Attempt, AttemptLedger, DailyChallenge, LedgerState, SubmittedAnswer};
use crate::error::EngineError;
use crate::questions::QuestionService;
use crate::stats::StatsStore;
use crate::store::KvStore;

/// Daily challenge allows 3 attempts before locking out.
pub const MAX_ATTEMPTS: usize = 3;

pub fn attempts_remaining(ledger: &AttemptLedger) -> usize {
    MAX_ATTEMPTS.saturating_sub(ledger.attempts.len())
}

/// What a successful submission produced.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub ledger: AttemptLedger,
    pub is_correct: bool,
    pub explanation: String,
}

pub struct AttemptLedgerStore {
    ledgers: KvStore<(String, String), AttemptLedger>,
    retry_cap: u32,
}

impl AttemptLedgerStore {
    pub fn new(op_timeout: Duration, retry_cap: u32) -> Self {
        Self { ledgers: KvStore::new(op_timeout), retry_cap }
    }

    /// Read-only view. `None` means the user has not submitted yet.
    pub async fn get(&self, user_id: &str, challenge_id: &str) -> Result<Option<AttemptLedger>, EngineError> {
        let key = (user_id.to_string(), challenge_id.to_string());
        Ok(self.ledgers.read(&key).await?.map(|v| v.record))
    }

    /// Record one submission. Atomic per (user, challenge): load or lazily
    /// create the ledger, reject if terminal, validate, append, transition,
    /// and on the transition to a terminal state update stats exactly once.
    #[instrument(level = "info", skip(self, challenge, answer, questions, stats), fields(%user_id, challenge_id = %challenge.id))]
    pub async fn submit(
        &self,
        user_id: &str,
        challenge: &DailyChallenge,
        answer: SubmittedAnswer,
        time_taken_seconds: Option<u32>,
        questions: &QuestionService,
        stats: &StatsStore,
    ) -> Result<SubmitOutcome, EngineError> {
        let key = (user_id.to_string(), challenge.id.clone());

        for _ in 0..=self.retry_cap {
            let (version, mut ledger) = match self.ledgers.read(&key).await? {
                Some(v) => (v.version, v.record),
                None => (0, AttemptLedger::new(user_id.to_string(), challenge.id.clone())),
            };

            if ledger.state.is_terminal() {
                return Err(EngineError::ChallengeAlreadyResolved);
            }

            let (is_correct, explanation) = questions.validate(&challenge.question, &answer);

            ledger.attempts.push(Attempt {
                answer: answer.clone(),
                is_correct,
                explanation: explanation.clone(),
                attempted_at: Utc::now(),
                time_taken_seconds,
            });
            ledger.state = if is_correct {
                LedgerState::Solved
            } else if ledger.attempts.len() >= MAX_ATTEMPTS {
                LedgerState::Exhausted
            } else {
                LedgerState::Open
            };

            match self.ledgers.compare_and_put(key.clone(), version, ledger.clone()).await {
                Ok(row) => {
                    let ledger = row.record;
                    if ledger.state.is_terminal() {
                        stats
                            .record(
                                user_id,
                                challenge.date,
                                is_correct,
                                &challenge.question.category,
                                &challenge.question.format,
                                &challenge.country_code,
                            )
                            .await?;
                        info!(target: "ledger", %user_id, challenge_id = %challenge.id, state = ?ledger.state, attempts = ledger.attempts.len(), "Ledger terminated");
                    }
                    return Ok(SubmitOutcome { ledger, is_correct, explanation });
                }
                Err(EngineError::TransientStoreConflict) => {
                    // Lost the version race; re-read and re-evaluate.
                    warn!(target: "ledger", %user_id, challenge_id = %challenge.id, "Submission conflict; retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(EngineError::TransientStoreConflict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::domain::{category, format, CanonicalAnswer, Question};
    use crate::seeds::seed_countries;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn text_challenge() -> DailyChallenge {
        DailyChallenge {
            id: "ch-1".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).expect("date"),
            country_code: "FRA".into(),
            question: Question {
                id: "q-1".into(),
                category: category::FLAG.into(),
                format: format::TEXT.into(),
                country_code: "FRA".into(),
                prompt_text: "Which country does this flag belong to?".into(),
                canonical_answer: CanonicalAnswer::Text { answer: "Paris".into(), alternates: vec![] },
                metadata: HashMap::new(),
            },
            cycle: 1,
            selection_algorithm: "v1_random".into(),
        }
    }

    fn choice_challenge() -> DailyChallenge {
        let mut ch = text_challenge();
        ch.question.format = format::MULTIPLE_CHOICE.into();
        ch.question.canonical_answer = CanonicalAnswer::Choice {
            correct: "France".into(),
            options: vec!["France".into(), "Japan".into(), "Brazil".into(), "Netherlands".into()],
        };
        ch
    }

    fn fixture() -> (AttemptLedgerStore, Arc<QuestionService>, StatsStore) {
        let catalog = Arc::new(Catalog::from_countries(seed_countries()));
        let questions = Arc::new(QuestionService::new(catalog));
        let timeout = Duration::from_millis(500);
        (AttemptLedgerStore::new(timeout, 4), questions, StatsStore::new(timeout, 4))
    }

    fn text(s: &str) -> SubmittedAnswer {
        SubmittedAnswer::Text { text: s.into() }
    }

    #[tokio::test]
    async fn wrong_then_correct_solves_on_attempt_two() {
        let (ledgers, questions, stats) = fixture();
        let ch = text_challenge();

        let first = ledgers
            .submit("u1", &ch, text("amsterdam"), None, &questions, &stats)
            .await
            .expect("submit");
        assert!(!first.is_correct);
        assert_eq!(first.ledger.state, LedgerState::Open);
        assert_eq!(attempts_remaining(&first.ledger), 2);

        let second = ledgers
            .submit("u1", &ch, text("Paris"), None, &questions, &stats)
            .await
            .expect("submit");
        assert!(second.is_correct);
        assert_eq!(second.ledger.state, LedgerState::Solved);
        assert_eq!(second.ledger.attempts.len(), 2);
        assert_eq!(attempts_remaining(&second.ledger), 1);
    }

    #[tokio::test]
    async fn three_wrong_choices_exhaust_and_lock_the_ledger() {
        let (ledgers, questions, stats) = fixture();
        let ch = choice_challenge();
        let wrong = SubmittedAnswer::Choice { selected_option: "Japan".into() };

        for n in 1..=3 {
            let out = ledgers
                .submit("u1", &ch, wrong.clone(), None, &questions, &stats)
                .await
                .expect("submit");
            assert!(!out.is_correct);
            assert_eq!(out.ledger.attempts.len(), n);
        }

        let ledger = ledgers.get("u1", &ch.id).await.expect("store").expect("ledger");
        assert_eq!(ledger.state, LedgerState::Exhausted);

        let err = ledgers
            .submit("u1", &ch, wrong, None, &questions, &stats)
            .await
            .expect_err("fourth submission");
        assert_eq!(err, EngineError::ChallengeAlreadyResolved);

        let after = ledgers.get("u1", &ch.id).await.expect("store").expect("ledger");
        assert_eq!(after.attempts.len(), 3, "rejected submission must not append");
    }

    #[tokio::test]
    async fn solved_ledger_rejects_further_submissions() {
        let (ledgers, questions, stats) = fixture();
        let ch = text_challenge();

        ledgers.submit("u1", &ch, text("paris"), None, &questions, &stats).await.expect("submit");
        let err = ledgers
            .submit("u1", &ch, text("paris"), None, &questions, &stats)
            .await
            .expect_err("already solved");
        assert_eq!(err, EngineError::ChallengeAlreadyResolved);
    }

    #[tokio::test]
    async fn ledgers_are_per_user() {
        let (ledgers, questions, stats) = fixture();
        let ch = text_challenge();

        ledgers.submit("u1", &ch, text("paris"), None, &questions, &stats).await.expect("submit");
        let other = ledgers
            .submit("u2", &ch, text("amsterdam"), None, &questions, &stats)
            .await
            .expect("independent ledger");
        assert_eq!(other.ledger.attempts.len(), 1);
        assert_eq!(other.ledger.state, LedgerState::Open);
    }

    #[tokio::test]
    async fn racing_submissions_terminate_once_and_update_stats_once() {
        let (ledgers, questions, stats) = fixture();
        let ledgers = Arc::new(ledgers);
        let stats = Arc::new(stats);
        let ch = Arc::new(text_challenge());

        // Two wrong attempts already on the books; the third terminates.
        for _ in 0..2 {
            ledgers.submit("u1", &ch, text("nope"), None, &questions, &stats).await.expect("submit");
        }

        let mut handles = Vec::new();
        for _ in 0..6 {
            let (ledgers, questions, stats, ch) =
                (ledgers.clone(), questions.clone(), stats.clone(), ch.clone());
            handles.push(tokio::spawn(async move {
                ledgers.submit("u1", &ch, text("still wrong"), None, &questions, &stats).await
            }));
        }

        let mut accepted = 0;
        let mut rejected = 0;
        for h in handles {
            match h.await.expect("join") {
                Ok(_) => accepted += 1,
                Err(EngineError::ChallengeAlreadyResolved) => rejected += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(accepted, 1, "exactly one racer lands the terminating attempt");
        assert_eq!(rejected, 5);

        let ledger = ledgers.get("u1", &ch.id).await.expect("store").expect("ledger");
        assert_eq!(ledger.attempts.len(), 3);
        assert_eq!(ledger.state, LedgerState::Exhausted);

        let s = stats.get("u1").await.expect("stats");
        let entry = s.category_breakdown.get(category::FLAG).expect("entry");
        assert_eq!(entry.total, 1, "stats recorded exactly once, not once per racer");
    }
}
