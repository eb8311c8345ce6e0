//! Domain models: raw questions as the trivia source ships them, and the
//! display-ready form every quiz session works with.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::decode_html;

/// One `results` entry from the question source (untrusted, may contain HTML entities).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct RawQuestion {
  pub question: String,
  pub correct_answer: String,
  #[serde(default)] pub incorrect_answers: Vec<String>,
  // Accepted and carried, not required by quiz logic.
  #[serde(default, rename = "type")] pub kind: Option<String>,
  #[serde(default)] pub difficulty: Option<String>,
  #[serde(default)] pub category: Option<String>,
}

/// Response envelope of the question source.
#[derive(Clone, Debug, Deserialize)]
pub struct SourceResponse {
  pub response_code: i64,
  #[serde(default)] pub results: Vec<RawQuestion>,
}

/// Display-ready question. `options` order is fixed once built.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedQuestion {
  pub text: String,
  pub correct_answer: String,
  pub options: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub category: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")] pub difficulty: Option<String>,
}

impl NormalizedQuestion {
  pub fn is_correct(&self, option: &str) -> bool {
    self.correct_answer == option
  }
}

/// Decode all text of `raw` and shuffle its options with `rng`.
/// Options are the correct answer plus every incorrect one; duplicates are kept.
pub fn normalize_question<R: Rng + ?Sized>(raw: &RawQuestion, rng: &mut R) -> NormalizedQuestion {
  let correct_answer = decode_html(&raw.correct_answer);
  let mut options: Vec<String> = raw.incorrect_answers.iter().map(|a| decode_html(a)).collect();
  options.push(correct_answer.clone());
  options.shuffle(rng);

  NormalizedQuestion {
    text: decode_html(&raw.question),
    correct_answer,
    options,
    category: raw.category.as_deref().map(decode_html),
    difficulty: raw.difficulty.clone(),
  }
}

/// Normalize a whole list, one independent shuffle per question.
pub fn normalize_all<R: Rng + ?Sized>(raw: &[RawQuestion], rng: &mut R) -> Vec<NormalizedQuestion> {
  raw.iter().map(|q| normalize_question(q, rng)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::SeedableRng;

  fn raw(q: &str, correct: &str, wrong: &[&str]) -> RawQuestion {
    RawQuestion {
      question: q.into(),
      correct_answer: correct.into(),
      incorrect_answers: wrong.iter().map(|s| s.to_string()).collect(),
      kind: Some("multiple".into()),
      difficulty: Some("hard".into()),
      category: Some("General Knowledge".into()),
    }
  }

  fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
  }

  #[test]
  fn options_are_a_permutation_of_decoded_answers() {
    let mut rng = StdRng::seed_from_u64(7);
    let q = raw("Who wrote &quot;Dune&quot;?", "Frank Herbert", &["Isaac Asimov", "Arthur C. Clarke", "Ursula K. Le Guin"]);
    for _ in 0..20 {
      let n = normalize_question(&q, &mut rng);
      assert_eq!(n.text, "Who wrote \"Dune\"?");
      assert_eq!(n.options.len(), 1 + q.incorrect_answers.len());
      assert!(n.options.contains(&n.correct_answer));
      let expected = sorted(vec![
        "Frank Herbert".into(),
        "Isaac Asimov".into(),
        "Arthur C. Clarke".into(),
        "Ursula K. Le Guin".into(),
      ]);
      assert_eq!(sorted(n.options.clone()), expected);
    }
  }

  #[test]
  fn answers_are_decoded_before_comparison() {
    let mut rng = StdRng::seed_from_u64(1);
    let q = raw("Q", "Rock &amp; Roll", &["Hip&#039;Hop", "Jazz"]);
    let n = normalize_question(&q, &mut rng);
    assert_eq!(n.correct_answer, "Rock & Roll");
    assert!(n.is_correct("Rock & Roll"));
    assert!(n.options.iter().any(|o| o == "Hip'Hop"));
    assert!(n.options.iter().all(|o| !o.contains("&amp;") && !o.contains("&#039;")));
    assert!(!n.is_correct("Rock &amp; Roll"));
  }

  #[test]
  fn empty_incorrect_answers_yield_single_option() {
    let mut rng = StdRng::seed_from_u64(3);
    let n = normalize_question(&raw("Only one?", "Yes", &[]), &mut rng);
    assert_eq!(n.options, vec!["Yes".to_string()]);
  }

  #[test]
  fn duplicates_are_not_removed() {
    let mut rng = StdRng::seed_from_u64(3);
    let n = normalize_question(&raw("Dup", "A", &["A", "B"]), &mut rng);
    assert_eq!(n.options.len(), 3);
  }

  #[test]
  fn same_seed_gives_same_order() {
    let qs: Vec<RawQuestion> = (0..5)
      .map(|i| raw(&format!("Q{i}"), "w", &["x", "y", "z"]))
      .collect();
    let a = normalize_all(&qs, &mut StdRng::seed_from_u64(99));
    let b = normalize_all(&qs, &mut StdRng::seed_from_u64(99));
    assert_eq!(a, b);
  }

  #[test]
  fn shuffle_varies_across_questions() {
    // With 24 possible orders, 40 identical questions all landing on one order is effectively impossible.
    let qs: Vec<RawQuestion> = (0..40).map(|_| raw("Q", "w", &["x", "y", "z"])).collect();
    let out = normalize_all(&qs, &mut StdRng::seed_from_u64(2024));
    let first = &out[0].options;
    assert!(out.iter().any(|n| &n.options != first));
  }

  #[test]
  fn source_response_tolerates_missing_optional_fields() {
    let body = r#"{"response_code":0,"results":[{"question":"Q","correct_answer":"A"}]}"#;
    let parsed: SourceResponse = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.response_code, 0);
    assert!(parsed.results[0].incorrect_answers.is_empty());
    assert!(parsed.results[0].kind.is_none());

    let no_results: SourceResponse = serde_json::from_str(r#"{"response_code":1}"#).unwrap();
    assert!(no_results.results.is_empty());
  }
}
