//! Built-in fallback questions. They keep the quiz playable when the remote
//! source is disabled, rate-limited or broken.

use crate::domain::RawQuestion;

fn hard_general(question: &str, correct: &str, incorrect: [&str; 3]) -> RawQuestion {
  RawQuestion {
    question: question.into(),
    correct_answer: correct.into(),
    incorrect_answers: incorrect.iter().map(|s| s.to_string()).collect(),
    kind: Some("multiple".into()),
    difficulty: Some("hard".into()),
    category: Some("General Knowledge".into()),
  }
}

/// Ten hard general-knowledge questions in the source's own format.
pub fn fallback_questions() -> Vec<RawQuestion> {
  vec![
    hard_general(
      "What year was the RoboSapien toy robot released?",
      "2004",
      ["2000", "2001", "2006"],
    ),
    hard_general(
      "Before the 19th Century, the &quot;Living Room&quot; was originally called the...",
      "Parlor",
      ["Open Room", "Sitting Room", "Loft"],
    ),
    hard_general(
      "The word &quot;astasia&quot; means which of the following?",
      "The inability to stand up",
      [
        "The inability to make decisions",
        "The inability to concentrate on anything",
        "A feverish desire to rip one&#039;s clothes off",
      ],
    ),
    hard_general(
      "What is the romanized Korean word for &quot;heart&quot;?",
      "Simjang",
      ["Aejeong", "Jeongsin", "Segseu"],
    ),
    hard_general(
      "Which of the following is an existing family in &quot;The Sims&quot;?",
      "The Goth Family",
      ["The Family", "The Simoleon Family", "The Proud Family"],
    ),
    hard_general(
      "The word &quot;aprosexia&quot; means which of the following?",
      "The inability to concentrate on anything",
      [
        "The inability to make decisions",
        "A feverish desire to rip one&#039;s clothes off",
        "The inability to stand up",
      ],
    ),
    hard_general(
      "The Swedish word &quot;Grunka&quot; means what in English?",
      "Thing",
      ["People", "Place", "Pineapple"],
    ),
    hard_general(
      "What type of dog is &#039;Handsome Dan&#039;, the mascot of Yale University?",
      "Bulldog",
      ["Yorkshire Terrier", "Boxer", "Pug"],
    ),
    hard_general(
      "Sciophobia is the fear of what?",
      "Shadows",
      ["Eating", "Bright lights", "Transportation"],
    ),
    hard_general(
      "What does the Latin phrase &quot;Veni, vidi, vici&quot; translate into English?",
      "I came, I saw, I conquered",
      [
        "See no evil, hear no evil, speak no evil",
        "Life, liberty, and happiness",
        "Past, present, and future",
      ],
    ),
  ]
}
