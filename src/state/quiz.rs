use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::dao::models::{AnswerKeyEntity, QuestionEntity, QuestionKindEntity, QuizEntity};

/// Question kinds understood by the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// One option out of several.
    MultipleChoice,
    /// Boolean answer.
    TrueFalse,
    /// Free text.
    ShortAnswer,
    /// Several options out of several.
    MultiSelect,
    /// Pairs of items.
    Matching,
    /// Self-assessed card.
    Flashcard,
}

/// Correct answer of a question, normalized for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    /// Single expected value (multiple choice, true/false, short answer).
    Exact(String),
    /// Exact set of options to tick.
    MultiSelect(BTreeSet<String>),
    /// Every left item mapped to its right item.
    Matching(BTreeMap<String, String>),
    /// Flashcards are graded by the learner's own verdict.
    SelfAssessed,
}

/// One gradable question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Identifier unique within the quiz.
    pub id: String,
    /// Question kind.
    pub kind: QuestionKind,
    /// Prompt shown to participants.
    pub prompt: String,
    /// Normalized answer key.
    pub key: AnswerKey,
    /// Author-assigned value; the arena formula does not use it.
    pub points: u32,
}

/// Immutable quiz definition as played by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    /// Quiz identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Questions in play order.
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Question at `index`, if the quiz has one.
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }
}

/// A quiz whose answer keys cannot be used for grading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("quiz `{quiz_id}` question `{question_id}`: {reason}")]
pub struct MalformedQuiz {
    /// Quiz holding the question.
    pub quiz_id: String,
    /// Offending question.
    pub question_id: String,
    /// What is wrong with its key.
    pub reason: &'static str,
}

/// Trim and lowercase a value so answers compare case-insensitively.
pub fn normalize_answer(value: &str) -> String {
    value.trim().to_lowercase()
}

impl From<QuestionKindEntity> for QuestionKind {
    fn from(value: QuestionKindEntity) -> Self {
        match value {
            QuestionKindEntity::MultipleChoice => QuestionKind::MultipleChoice,
            QuestionKindEntity::TrueFalse => QuestionKind::TrueFalse,
            QuestionKindEntity::ShortAnswer => QuestionKind::ShortAnswer,
            QuestionKindEntity::MultiSelect => QuestionKind::MultiSelect,
            QuestionKindEntity::Matching => QuestionKind::Matching,
            QuestionKindEntity::Flashcard => QuestionKind::Flashcard,
        }
    }
}

fn answer_key(question: &QuestionEntity) -> Result<AnswerKey, &'static str> {
    let kind = QuestionKind::from(question.kind);
    let key = match (kind, &question.answer) {
        (QuestionKind::Flashcard, _) => AnswerKey::SelfAssessed,
        (QuestionKind::Matching, _) => {
            if question.pairs.is_empty() {
                return Err("matching question declares no pairs");
            }
            AnswerKey::Matching(
                question
                    .pairs
                    .iter()
                    .map(|pair| (normalize_answer(&pair.left), normalize_answer(&pair.right)))
                    .collect(),
            )
        }
        (QuestionKind::MultiSelect, Some(AnswerKeyEntity::Choices(choices))) => {
            AnswerKey::MultiSelect(choices.iter().map(|c| normalize_answer(c)).collect())
        }
        (QuestionKind::MultiSelect, Some(AnswerKeyEntity::Text(single))) => {
            AnswerKey::MultiSelect(BTreeSet::from([normalize_answer(single)]))
        }
        (_, Some(AnswerKeyEntity::Text(text))) => AnswerKey::Exact(normalize_answer(text)),
        (_, Some(AnswerKeyEntity::Flag(flag))) => AnswerKey::Exact(flag.to_string()),
        (_, Some(AnswerKeyEntity::Choices(choices))) if choices.len() == 1 => {
            AnswerKey::Exact(normalize_answer(&choices[0]))
        }
        (_, Some(AnswerKeyEntity::Choices(_))) => {
            return Err("single-answer question lists several answers");
        }
        (_, None) => return Err("question has no correct answer"),
    };
    Ok(key)
}

impl TryFrom<QuizEntity> for Quiz {
    type Error = MalformedQuiz;

    fn try_from(value: QuizEntity) -> Result<Self, Self::Error> {
        let quiz_id = value.id;
        let questions = value
            .questions
            .into_iter()
            .map(|question| {
                let key = answer_key(&question).map_err(|reason| MalformedQuiz {
                    quiz_id: quiz_id.clone(),
                    question_id: question.id.clone(),
                    reason,
                })?;
                Ok(Question {
                    id: question.id,
                    kind: question.kind.into(),
                    prompt: question.question,
                    key,
                    points: question.points,
                })
            })
            .collect::<Result<Vec<_>, MalformedQuiz>>()?;

        Ok(Self {
            id: quiz_id,
            title: value.title,
            questions,
        })
    }
}
