//! Quiz progression: position, answer lock, score and completion for one session.
//!
//! The engine is a two-state machine. `advance()` on the answered last
//! question enters `Complete` and keeps the final score; only `restart()`
//! leads back to `Active`.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::domain::NormalizedQuestion;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
  Active,
  Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectOutcome {
  Correct,
  Incorrect,
  /// Already answered, complete, or no current question.
  Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvanceOutcome {
  Moved { index: usize },
  Completed { score: usize, total: usize, rating: Rating },
  Ignored,
}

/// Results-screen grading of a finished quiz.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
  /// Every question answered correctly.
  Perfect,
  /// More than half correct.
  Great,
  GoodEffort,
}

impl Rating {
  pub fn grade(score: usize, total: usize) -> Self {
    if score == total {
      Rating::Perfect
    } else if score * 2 > total {
      Rating::Great
    } else {
      Rating::GoodEffort
    }
  }
}

/// Read-only snapshot for rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizView {
  pub current_question: Option<NormalizedQuestion>,
  pub current_question_index: usize,
  pub score: usize,
  pub selected_option: Option<String>,
  pub answered: bool,
  pub is_last_question: bool,
  pub total_questions: usize,
  pub complete: bool,
  /// Set once the quiz is complete.
  pub rating: Option<Rating>,
}

#[derive(Clone, Debug)]
pub struct QuizEngine {
  questions: Arc<Vec<NormalizedQuestion>>,
  current_index: usize,
  score: usize,
  selected: Option<String>,
  answered: bool,
  phase: Phase,
}

impl QuizEngine {
  pub fn new(questions: Arc<Vec<NormalizedQuestion>>) -> Self {
    Self {
      questions,
      current_index: 0,
      score: 0,
      selected: None,
      answered: false,
      phase: Phase::Active,
    }
  }

  #[cfg(test)]
  pub fn phase(&self) -> Phase { self.phase }
  #[cfg(test)]
  pub fn score(&self) -> usize { self.score }
  #[cfg(test)]
  pub fn current_index(&self) -> usize { self.current_index }
  #[cfg(test)]
  pub fn selected(&self) -> Option<&str> { self.selected.as_deref() }
  #[cfg(test)]
  pub fn answered(&self) -> bool { self.answered }
  #[cfg(test)]
  pub fn total_questions(&self) -> usize { self.questions.len() }

  /// None when the list is empty or the session is complete.
  pub fn current_question(&self) -> Option<&NormalizedQuestion> {
    match self.phase {
      Phase::Active => self.questions.get(self.current_index),
      Phase::Complete => None,
    }
  }

  pub fn is_last_question(&self) -> bool {
    !self.questions.is_empty() && self.current_index == self.questions.len() - 1
  }

  /// Commit `option` as the answer to the current question. One shot per question.
  pub fn select_option(&mut self, option: &str) -> SelectOutcome {
    if self.answered {
      debug!(target: "session", index = self.current_index, "Ignoring selection: already answered");
      return SelectOutcome::Ignored;
    }
    let correct = match self.current_question() {
      Some(q) => q.is_correct(option),
      None => return SelectOutcome::Ignored,
    };

    self.selected = Some(option.to_string());
    self.answered = true;
    if correct {
      self.score += 1;
      SelectOutcome::Correct
    } else {
      SelectOutcome::Incorrect
    }
  }

  /// Move past the answered current question; completes the session on the last one.
  pub fn advance(&mut self) -> AdvanceOutcome {
    if self.phase == Phase::Complete || self.questions.is_empty() {
      return AdvanceOutcome::Ignored;
    }
    if !self.answered {
      debug!(target: "session", index = self.current_index, "Ignoring advance: question not answered");
      return AdvanceOutcome::Ignored;
    }

    if self.is_last_question() {
      self.phase = Phase::Complete;
      self.clear_selection();
      debug!(target: "session", score = self.score, total = self.questions.len(), "Quiz complete");
      AdvanceOutcome::Completed {
        score: self.score,
        total: self.questions.len(),
        rating: Rating::grade(self.score, self.questions.len()),
      }
    } else {
      self.current_index += 1;
      self.clear_selection();
      AdvanceOutcome::Moved { index: self.current_index }
    }
  }

  /// Back to the first question with a zero score. Questions are kept as-is.
  pub fn restart(&mut self) {
    self.current_index = 0;
    self.score = 0;
    self.clear_selection();
    self.phase = Phase::Active;
  }

  pub fn view(&self) -> QuizView {
    QuizView {
      current_question: self.current_question().cloned(),
      current_question_index: self.current_index,
      score: self.score,
      selected_option: self.selected.clone(),
      answered: self.answered,
      is_last_question: self.is_last_question(),
      total_questions: self.questions.len(),
      complete: self.phase == Phase::Complete,
      rating: match self.phase {
        Phase::Complete => Some(Rating::grade(self.score, self.questions.len())),
        Phase::Active => None,
      },
    }
  }

  fn clear_selection(&mut self) {
    self.selected = None;
    self.answered = false;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn q(text: &str, correct: &str, options: &[&str]) -> NormalizedQuestion {
    NormalizedQuestion {
      text: text.into(),
      correct_answer: correct.into(),
      options: options.iter().map(|s| s.to_string()).collect(),
      category: None,
      difficulty: None,
    }
  }

  fn three() -> Arc<Vec<NormalizedQuestion>> {
    Arc::new(vec![
      q("one", "a", &["a", "b"]),
      q("two", "c", &["c", "d"]),
      q("three", "e", &["e", "f"]),
    ])
  }

  fn assert_reset(e: &QuizEngine) {
    assert_eq!(e.current_index(), 0);
    assert_eq!(e.score(), 0);
    assert_eq!(e.selected(), None);
    assert!(!e.answered());
    assert_eq!(e.phase(), Phase::Active);
  }

  #[test]
  fn starts_active_on_first_question() {
    let e = QuizEngine::new(three());
    assert_reset(&e);
    assert_eq!(e.current_question().map(|q| q.text.as_str()), Some("one"));
    assert!(!e.is_last_question());
    assert_eq!(e.total_questions(), 3);
  }

  #[test]
  fn answer_is_locked_after_first_selection() {
    let mut e = QuizEngine::new(three());
    assert_eq!(e.select_option("b"), SelectOutcome::Incorrect);
    assert_eq!(e.select_option("a"), SelectOutcome::Ignored);
    assert_eq!(e.score(), 0);
    assert_eq!(e.selected(), Some("b"));

    let mut e = QuizEngine::new(three());
    assert_eq!(e.select_option("a"), SelectOutcome::Correct);
    assert_eq!(e.select_option("a"), SelectOutcome::Ignored);
    assert_eq!(e.score(), 1);
    assert_eq!(e.selected(), Some("a"));
  }

  #[test]
  fn advance_requires_an_answer() {
    let mut e = QuizEngine::new(three());
    assert_eq!(e.advance(), AdvanceOutcome::Ignored);
    assert_eq!(e.current_index(), 0);
  }

  #[test]
  fn advance_moves_and_clears_selection() {
    let mut e = QuizEngine::new(three());
    e.select_option("a");
    assert_eq!(e.advance(), AdvanceOutcome::Moved { index: 1 });
    assert_eq!(e.selected(), None);
    assert!(!e.answered());
    assert_eq!(e.score(), 1);
  }

  #[test]
  fn last_advance_completes_and_keeps_score() {
    let mut e = QuizEngine::new(three());
    for answer in ["a", "x", "e"] {
      e.select_option(answer);
      if !e.is_last_question() {
        e.advance();
      }
    }
    assert!(e.is_last_question());
    assert_eq!(e.advance(), AdvanceOutcome::Completed { score: 2, total: 3, rating: Rating::Great });

    let view = e.view();
    assert!(view.complete);
    assert_eq!(view.score, 2);
    assert_eq!(view.rating, Some(Rating::Great));
    assert!(view.current_question.is_none());
    assert_eq!(e.select_option("a"), SelectOutcome::Ignored);
    assert_eq!(e.advance(), AdvanceOutcome::Ignored);
    assert_eq!(e.score(), 2);
  }

  #[test]
  fn single_question_completes_in_one_advance() {
    let mut e = QuizEngine::new(Arc::new(vec![q("only", "yes", &["no", "yes"])]));
    assert!(e.is_last_question());
    assert_eq!(e.select_option("yes"), SelectOutcome::Correct);
    assert_eq!(e.score(), 1);
    assert!(e.answered());
    assert_eq!(e.selected(), Some("yes"));
    assert_eq!(e.advance(), AdvanceOutcome::Completed { score: 1, total: 1, rating: Rating::Perfect });
    assert_eq!(e.phase(), Phase::Complete);
  }

  #[test]
  fn rating_follows_results_screen_thresholds() {
    assert_eq!(Rating::grade(10, 10), Rating::Perfect);
    assert_eq!(Rating::grade(6, 10), Rating::Great);
    assert_eq!(Rating::grade(5, 10), Rating::GoodEffort);
    assert_eq!(Rating::grade(2, 3), Rating::Great);
    assert_eq!(Rating::grade(0, 1), Rating::GoodEffort);
    assert_eq!(QuizEngine::new(three()).view().rating, None);
  }

  #[test]
  fn restart_resets_from_any_state() {
    let mut e = QuizEngine::new(three());
    e.select_option("a");
    e.restart();
    assert_reset(&e);

    e.select_option("a");
    e.advance();
    e.select_option("c");
    e.advance();
    e.select_option("e");
    e.advance();
    assert_eq!(e.phase(), Phase::Complete);
    e.restart();
    assert_reset(&e);
    assert_eq!(e.view().rating, None);
    assert_eq!(e.current_question().map(|q| q.options.clone()), Some(vec!["a".to_string(), "b".to_string()]));
  }

  #[test]
  fn empty_question_list_is_inert() {
    let mut e = QuizEngine::new(Arc::new(Vec::new()));
    assert!(e.current_question().is_none());
    assert!(!e.is_last_question());
    assert_eq!(e.select_option("a"), SelectOutcome::Ignored);
    assert_eq!(e.advance(), AdvanceOutcome::Ignored);
    assert!(!e.answered());
    let view = e.view();
    assert_eq!(view.total_questions, 0);
    assert!(!view.complete);
  }

  #[test]
  fn score_never_decreases_across_arbitrary_events() {
    let mut e = QuizEngine::new(three());
    let script = ["a", "!", "a", ">", "z", ">", "e", "e", ">", ">", "a", "!"];
    let mut last = e.score();
    let mut correct_answers = 0;
    for step in script {
      match step {
        ">" => {
          e.advance();
        }
        "!" => {
          let before = e.score();
          let outcome = e.select_option("a");
          if outcome == SelectOutcome::Correct {
            correct_answers += 1;
          }
          assert!(e.score() <= before + 1);
        }
        opt => {
          if e.select_option(opt) == SelectOutcome::Correct {
            correct_answers += 1;
          }
        }
      }
      assert!(e.score() >= last);
      assert!(e.score() <= correct_answers);
      if !e.answered() {
        assert!(e.selected().is_none());
      }
      if e.phase() == Phase::Active {
        assert!(e.current_index() < e.total_questions());
      }
      last = e.score();
    }
  }
}
