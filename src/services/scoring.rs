//! Pure answer grading and point computation.

use std::collections::{BTreeMap, BTreeSet};

use crate::state::quiz::{AnswerKey, normalize_answer};

/// Points granted for any correct answer, regardless of speed.
pub const BASE_POINTS: u32 = 50;
/// Extra points available for an instant answer.
pub const SPEED_BONUS: u32 = 50;

/// Value submitted by a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// True/false verdict or flashcard self-assessment.
    Flag(bool),
    /// Option or free text.
    Text(String),
    /// Ticked options.
    Choices(Vec<String>),
    /// Left item to right item.
    Pairs(BTreeMap<String, String>),
}

/// Result of one submission as seen by the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreOutcome {
    /// False for a repeated submission on an already scored question.
    pub accepted: bool,
    /// Whether the answer matched the key.
    pub correct: bool,
    /// Points credited by this submission.
    pub points_awarded: u32,
    /// Participant score after the submission.
    pub score: u32,
}

const SELF_ASSESSED_YES: [&str; 4] = ["true", "correct", "known", "yes"];

/// Grade `submission` against the stored key. A shape that does not fit the
/// question kind is simply wrong.
pub fn is_correct(key: &AnswerKey, submission: &Submission) -> bool {
    match (key, submission) {
        (AnswerKey::Exact(expected), Submission::Text(text)) => normalize_answer(text) == *expected,
        (AnswerKey::Exact(expected), Submission::Flag(flag)) => flag.to_string() == *expected,
        (AnswerKey::Exact(expected), Submission::Choices(choices)) => {
            matches!(choices.as_slice(), [only] if normalize_answer(only) == *expected)
        }
        (AnswerKey::MultiSelect(expected), Submission::Choices(choices)) => {
            choices
                .iter()
                .map(|choice| normalize_answer(choice))
                .collect::<BTreeSet<_>>()
                == *expected
        }
        (AnswerKey::MultiSelect(expected), Submission::Text(text)) => {
            expected.len() == 1 && expected.contains(&normalize_answer(text))
        }
        (AnswerKey::Matching(expected), Submission::Pairs(pairs)) => {
            pairs.len() == expected.len()
                && pairs
                    .iter()
                    .map(|(left, right)| (normalize_answer(left), normalize_answer(right)))
                    .collect::<BTreeMap<_, _>>()
                    == *expected
        }
        (AnswerKey::SelfAssessed, Submission::Flag(knew_it)) => *knew_it,
        (AnswerKey::SelfAssessed, Submission::Text(verdict)) => {
            SELF_ASSESSED_YES.contains(&normalize_answer(verdict).as_str())
        }
        _ => false,
    }
}

/// `50 + floor(remaining / time_per_question * 50)`, with `remaining` clamped
/// into `[0, time_per_question]`.
pub fn points_for(time_remaining_seconds: f64, time_per_question_seconds: u32) -> u32 {
    if time_per_question_seconds == 0 {
        return BASE_POINTS;
    }
    let window = f64::from(time_per_question_seconds);
    let remaining = if time_remaining_seconds.is_finite() {
        time_remaining_seconds.clamp(0.0, window)
    } else {
        0.0
    };
    let bonus = (remaining * f64::from(SPEED_BONUS) / window).floor() as u32;
    BASE_POINTS + bonus.min(SPEED_BONUS)
}

/// Points for a graded submission.
pub fn award(correct: bool, time_remaining_seconds: f64, time_per_question_seconds: u32) -> u32 {
    if correct {
        points_for(time_remaining_seconds, time_per_question_seconds)
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(l, r)| ((*l).to_owned(), (*r).to_owned()))
            .collect()
    }

    #[test]
    fn points_follow_remaining_time() {
        assert_eq!(points_for(30.0, 30), 100);
        assert_eq!(points_for(0.0, 30), 50);
        assert_eq!(points_for(8.0, 10), 90);
        assert_eq!(points_for(2.0, 10), 60);
        assert_eq!(points_for(7.0, 30), 61);
        assert_eq!(award(false, 30.0, 30), 0);
    }

    #[test]
    fn remaining_time_is_clamped() {
        assert_eq!(points_for(45.0, 30), 100);
        assert_eq!(points_for(-3.0, 30), 50);
        assert_eq!(points_for(f64::NAN, 30), 50);
        assert_eq!(points_for(f64::INFINITY, 30), 50);
    }

    #[test]
    fn single_answers_ignore_case_and_padding() {
        let key = AnswerKey::Exact("paris".into());
        assert!(is_correct(&key, &Submission::Text("  PARIS ".into())));
        assert!(!is_correct(&key, &Submission::Text("Lyon".into())));
        assert!(is_correct(&key, &Submission::Choices(vec!["Paris".into()])));

        let boolean = AnswerKey::Exact("false".into());
        assert!(is_correct(&boolean, &Submission::Flag(false)));
        assert!(is_correct(&boolean, &Submission::Text("False".into())));
        assert!(!is_correct(&boolean, &Submission::Flag(true)));
    }

    #[test]
    fn multi_select_requires_the_exact_set() {
        let key = AnswerKey::MultiSelect(BTreeSet::from(["a".to_owned(), "c".to_owned()]));
        assert!(is_correct(
            &key,
            &Submission::Choices(vec!["C".into(), "a".into()])
        ));
        assert!(!is_correct(&key, &Submission::Choices(vec!["a".into()])));
        assert!(!is_correct(
            &key,
            &Submission::Choices(vec!["a".into(), "b".into(), "c".into()])
        ));
    }

    #[test]
    fn matching_is_all_or_nothing() {
        let key = AnswerKey::Matching(pairs(&[("cat", "meow"), ("dog", "woof")]));
        assert!(is_correct(
            &key,
            &Submission::Pairs(pairs(&[("Dog", "Woof"), ("cat", "meow")]))
        ));
        assert!(!is_correct(
            &key,
            &Submission::Pairs(pairs(&[("cat", "woof"), ("dog", "meow")]))
        ));
        assert!(!is_correct(&key, &Submission::Pairs(pairs(&[("cat", "meow")]))));
        assert!(!is_correct(
            &key,
            &Submission::Pairs(pairs(&[("cat", "meow"), ("dog", "woof"), ("cow", "moo")]))
        ));
    }

    #[test]
    fn flashcards_trust_the_learner() {
        assert!(is_correct(&AnswerKey::SelfAssessed, &Submission::Flag(true)));
        assert!(!is_correct(&AnswerKey::SelfAssessed, &Submission::Flag(false)));
        assert!(is_correct(
            &AnswerKey::SelfAssessed,
            &Submission::Text("Correct".into())
        ));
    }

    #[test]
    fn mismatched_shapes_are_wrong() {
        let key = AnswerKey::Matching(pairs(&[("cat", "meow")]));
        assert!(!is_correct(&key, &Submission::Text("cat".into())));
        assert!(!is_correct(
            &AnswerKey::Exact("x".into()),
            &Submission::Pairs(pairs(&[("x", "y")]))
        ));
    }
}
