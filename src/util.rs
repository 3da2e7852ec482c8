//! Small utility helpers used across modules.

/// Normalize an answer string for comparison: trimmed, lowercased.
/// Text matching is case-insensitive throughout.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
#[allow(dead_code)]
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max { s.to_string() } else { format!("{}… ({} bytes total)", &s[..max], s.len()) }
}
