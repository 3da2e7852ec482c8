//! Question definition and answer validation.
//!
//! Flow:
//! 1) `define` derives one fact from the country for the requested category.
//! 2) The format shapes that fact into a canonical answer (`text`,
//!    `multiple_choice`, `boolean`).
//! 3) `ValidatorRegistry` dispatches validation strictly on the format
//!    string. Registering a new format is the only step needed to add one;
//!    an unregistered format fails closed, never silently "correct".
//!
//! Explanations name the canonical answer only for a correct attempt (which
//! is terminal by definition). Wrong attempts get a neutral explanation; the
//! full canonical answer ships with the terminal response instead.

use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::error;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::{category, format, CanonicalAnswer, Country, Question, SubmittedAnswer};
use crate::error::EngineError;
use crate::util::normalize_answer;

/// Comparison function for one format. Pure: canonical + submitted in,
/// verdict + explanation out.
pub type ValidateFn = fn(&CanonicalAnswer, &SubmittedAnswer) -> (bool, String);

pub struct ValidatorRegistry {
  by_format: HashMap<String, ValidateFn>,
}

impl Default for ValidatorRegistry {
  fn default() -> Self {
    let mut r = Self { by_format: HashMap::new() };
    r.register(format::TEXT, validate_text);
    r.register(format::MULTIPLE_CHOICE, validate_multiple_choice);
    r.register(format::BOOLEAN, validate_boolean);
    r
  }
}

impl ValidatorRegistry {
  pub fn register(&mut self, format: &str, f: ValidateFn) {
    self.by_format.insert(format.to_string(), f);
  }

  pub fn supports(&self, format: &str) -> bool {
    self.by_format.contains_key(format)
  }

  /// Validate a submission against a question. Unknown format fails closed
  /// and is logged as a data-integrity defect.
  pub fn validate(&self, question: &Question, submitted: &SubmittedAnswer) -> (bool, String) {
    match self.by_format.get(&question.format) {
      Some(f) => f(&question.canonical_answer, submitted),
      None => {
        error!(target: "challenge", question_id = %question.id, format = %question.format, "No validator registered for format; failing closed.");
        (false, "unsupported format".into())
      }
    }
  }
}

fn validate_text(canonical: &CanonicalAnswer, submitted: &SubmittedAnswer) -> (bool, String) {
  let (CanonicalAnswer::Text { answer, alternates }, SubmittedAnswer::Text { text }) = (canonical, submitted) else {
    return (false, "answer shape does not match the question format".into());
  };
  let given = normalize_answer(text);
  let ok = given == normalize_answer(answer)
    || alternates.iter().any(|alt| given == normalize_answer(alt));
  if ok {
    (true, format!("Correct answer: {}", answer))
  } else {
    (false, "Incorrect.".into())
  }
}

fn validate_multiple_choice(canonical: &CanonicalAnswer, submitted: &SubmittedAnswer) -> (bool, String) {
  let (CanonicalAnswer::Choice { correct, .. }, SubmittedAnswer::Choice { selected_option }) = (canonical, submitted) else {
    return (false, "answer shape does not match the question format".into());
  };
  if selected_option == correct {
    (true, format!("Correct answer: {}", correct))
  } else {
    (false, "Incorrect.".into())
  }
}

fn validate_boolean(canonical: &CanonicalAnswer, submitted: &SubmittedAnswer) -> (bool, String) {
  let (CanonicalAnswer::Boolean { answer }, SubmittedAnswer::Boolean { answer: given }) = (canonical, submitted) else {
    return (false, "answer shape does not match the question format".into());
  };
  if given == answer {
    (true, format!("The statement is {}", answer))
  } else {
    (false, "Incorrect.".into())
  }
}

/// Builds questions for a country and validates answers against them.
pub struct QuestionService {
  registry: ValidatorRegistry,
  catalog: Arc<Catalog>,
}

/// One fact derived from a country for a category: the prompt asking for it,
/// its value, and accepted alternates (flag questions accept name variants).
struct Fact {
  prompt: String,
  value: String,
  alternates: Vec<String>,
}

impl QuestionService {
  pub fn new(catalog: Arc<Catalog>) -> Self {
    Self { registry: ValidatorRegistry::default(), catalog }
  }

  #[allow(dead_code)]
  pub fn registry_mut(&mut self) -> &mut ValidatorRegistry {
    &mut self.registry
  }

  pub fn validate(&self, question: &Question, submitted: &SubmittedAnswer) -> (bool, String) {
    self.registry.validate(question, submitted)
  }

  /// Build a question for `country` in the given category and format.
  pub fn define(
    &self,
    country: &Country,
    cat: &str,
    fmt: &str,
    rng: &mut StdRng,
  ) -> Result<Question, EngineError> {
    if !self.registry.supports(fmt) {
      return Err(EngineError::UnsupportedFormat(fmt.to_string()));
    }
    let fact = fact_for(country, cat)?;
    let mut metadata = HashMap::new();

    let (prompt_text, canonical_answer) = match fmt {
      format::TEXT => (
        fact.prompt,
        CanonicalAnswer::Text { answer: fact.value, alternates: fact.alternates },
      ),
      format::MULTIPLE_CHOICE => {
        let mut options = self.distractors(cat, &fact.value, 3, rng)?;
        options.push(fact.value.clone());
        options.shuffle(rng);
        metadata.insert(
          "options".to_string(),
          serde_json::to_value(&options).unwrap_or_default(),
        );
        (fact.prompt, CanonicalAnswer::Choice { correct: fact.value, options })
      }
      format::BOOLEAN => {
        let decoys = self.distractors(cat, &fact.value, 1, rng)?;
        let candidate = match decoys.first() {
          Some(decoy) if rng.gen_bool(0.5) => decoy.clone(),
          _ => fact.value.clone(),
        };
        let answer = candidate == fact.value;
        (statement_for(country, cat, &candidate), CanonicalAnswer::Boolean { answer })
      }
      other => return Err(EngineError::UnsupportedFormat(other.to_string())),
    };

    Ok(Question {
      id: Uuid::new_v4().to_string(),
      category: cat.to_string(),
      format: fmt.to_string(),
      country_code: country.code.clone(),
      prompt_text,
      canonical_answer,
      metadata,
    })
  }

  /// Sample up to `want` distinct fact values for the same category from
  /// other catalog countries.
  fn distractors(
    &self,
    cat: &str,
    exclude: &str,
    want: usize,
    rng: &mut StdRng,
  ) -> Result<Vec<String>, EngineError> {
    let mut pool: Vec<String> = Vec::new();
    for c in self.catalog.iter() {
      let fact = fact_for(c, cat)?;
      if fact.value != exclude && !fact.value.is_empty() && !pool.contains(&fact.value) {
        pool.push(fact.value);
      }
    }
    Ok(pool.choose_multiple(rng, want).cloned().collect())
  }
}

fn fact_for(country: &Country, cat: &str) -> Result<Fact, EngineError> {
  let fact = match cat {
    category::FLAG => Fact {
      prompt: "Which country does this flag belong to?".into(),
      value: country.name.clone(),
      alternates: country.alternates.clone(),
    },
    category::CAPITAL => Fact {
      prompt: format!("What is the capital of {}?", country.name),
      value: country.capital.clone(),
      alternates: Vec::new(),
    },
    category::LARGEST_CITY => Fact {
      prompt: format!("What is the largest city of {}?", country.name),
      value: country.largest_city.clone(),
      alternates: Vec::new(),
    },
    category::LANGUAGE => Fact {
      prompt: format!("Which language is widely spoken in {}?", country.name),
      value: country.languages.first().cloned().unwrap_or_default(),
      alternates: Vec::new(),
    },
    category::CURRENCY => Fact {
      prompt: format!("What currency is used in {}?", country.name),
      value: country.currency.clone(),
      alternates: Vec::new(),
    },
    other => return Err(EngineError::UnknownCategory(other.to_string())),
  };
  Ok(fact)
}

fn statement_for(country: &Country, cat: &str, candidate: &str) -> String {
  let statement = match cat {
    category::FLAG => format!("This is the flag of {}.", candidate),
    category::CAPITAL => format!("{} is the capital of {}.", candidate, country.name),
    category::LARGEST_CITY => format!("{} is the largest city of {}.", candidate, country.name),
    category::LANGUAGE => format!("{} is widely spoken in {}.", candidate, country.name),
    category::CURRENCY => format!("{} uses the {}.", country.name, candidate),
    // fact_for has already rejected unknown categories
    _ => format!("{} is the answer.", candidate),
  };
  format!("{} True or false?", statement)
}
