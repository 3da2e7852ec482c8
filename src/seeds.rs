//! Seed data and small utilities related to default content.

use std::collections::HashMap;

use crate::domain::Country;

fn country(
  code: &str,
  name: &str,
  alternates: &[&str],
  flag_emoji: &str,
  flag_alt_text: &str,
  capital: &str,
  largest_city: &str,
  population: u64,
  languages: &[&str],
  currency: &str,
) -> Country {
  Country {
    code: code.into(),
    name: name.into(),
    alternates: alternates.iter().map(|s| (*s).to_string()).collect(),
    flag_emoji: flag_emoji.into(),
    flag_svg_url: format!("https://flagcdn.com/{}.svg", code.to_lowercase()),
    flag_png_url: format!("https://flagcdn.com/w320/{}.png", code.to_lowercase()),
    // Alt text describes the flag without naming the country: for the daily
    // flag category the name is the canonical answer.
    flag_alt_text: flag_alt_text.into(),
    capital: capital.into(),
    largest_city: largest_city.into(),
    population,
    languages: languages.iter().map(|s| (*s).to_string()).collect(),
    currency: currency.into(),
    extra: HashMap::new(),
  }
}

/// Minimal set of built-in countries that guarantee the app is useful even
/// without an external catalog file.
pub fn seed_countries() -> Vec<Country> {
  vec![
    country(
      "FRA", "France", &["french republic"],
      "🇫🇷", "Three equal vertical bands of blue, white and red",
      "Paris", "Paris", 68_000_000, &["French"], "Euro",
    ),
    country(
      "JPN", "Japan", &["nippon", "nihon"],
      "🇯🇵", "A crimson disc centered on a white field",
      "Tokyo", "Tokyo", 125_000_000, &["Japanese"], "Japanese yen",
    ),
    country(
      "USA", "United States", &["united states of america", "america", "the states", "us"],
      "🇺🇸", "Thirteen horizontal stripes with fifty white stars on a blue canton",
      "Washington, D.C.", "New York City", 334_000_000, &["English"], "US Dollar",
    ),
    country(
      "NLD", "Netherlands", &["holland", "the netherlands"],
      "🇳🇱", "Three equal horizontal bands of red, white and blue",
      "Amsterdam", "Amsterdam", 17_800_000, &["Dutch"], "Euro",
    ),
    country(
      "BRA", "Brazil", &["brasil", "federative republic of brazil"],
      "🇧🇷", "A yellow rhombus on a green field with a starred blue globe",
      "Brasília", "São Paulo", 216_000_000, &["Portuguese"], "Brazilian real",
    ),
  ]
}
