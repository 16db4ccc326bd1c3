use crate::catalog::QuestionSet;
use crate::resolver::OptionResolver;
use crate::types::{known_weight, sanitize_price, AnswerTuple, PartOption, Pick, Question, Totals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Wizard screen the user was last on. Owned by the UI layer, persisted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    #[serde(rename = "step-size")]
    Size,
    #[serde(rename = "step-style")]
    Style,
    #[serde(rename = "step-video")]
    Video,
    #[serde(rename = "step-part")]
    Part,
    #[serde(rename = "step-results")]
    Results,
}

impl Step {
    pub fn for_question(question: Question) -> Self {
        match question {
            Question::Size => Self::Size,
            Question::Style => Self::Style,
            Question::Video => Self::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("cannot answer {question} before {missing}")]
    OutOfOrder {
        question: Question,
        missing: Question,
    },
    #[error("{0} answer must not be empty")]
    EmptyValue(Question),
    #[error("unknown {question} '{value}'; allowed: {}", .allowed.join(", "))]
    UnknownChoice {
        question: Question,
        value: String,
        allowed: Vec<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    #[serde(default)]
    pub step: Option<Step>,
    #[serde(flatten)]
    pub answers: AnswerTuple,
    #[serde(default)]
    pub picks: BTreeMap<String, Pick>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    answers: AnswerTuple,
    picks: BTreeMap<String, Pick>,
    step: Option<Step>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(&self) -> &AnswerTuple {
        &self.answers
    }

    pub fn picks(&self) -> &BTreeMap<String, Pick> {
        &self.picks
    }

    pub fn pick(&self, part: &str) -> Option<&Pick> {
        self.picks.get(part)
    }

    pub fn step(&self) -> Option<Step> {
        self.step
    }

    pub fn set_step(&mut self, step: Step) {
        self.step = Some(step);
    }

    /// Sets one answer, unsetting every later answer and clearing all picks.
    ///
    /// When the new size allows exactly one style, that style is filled in.
    pub fn set_answer(
        &mut self,
        question: Question,
        value: impl AsRef<str>,
        questions: &QuestionSet,
    ) -> Result<(), SelectionError> {
        let value = value.as_ref().trim();
        if value.is_empty() {
            return Err(SelectionError::EmptyValue(question));
        }
        if let Some(missing) = question
            .earlier()
            .iter()
            .copied()
            .find(|q| self.answers.get(*q).is_none())
        {
            return Err(SelectionError::OutOfOrder { question, missing });
        }
        let allowed = self.allowed_choices(question, questions);
        if !allowed.is_empty() && !allowed.iter().any(|v| v == value) {
            return Err(SelectionError::UnknownChoice {
                question,
                value: value.to_string(),
                allowed: allowed.to_vec(),
            });
        }

        *self.answers.slot_mut(question) = Some(value.to_string());
        for later in question.later() {
            *self.answers.slot_mut(*later) = None;
        }
        self.picks.clear();

        if question == Question::Size {
            self.autofill_style(questions);
        }
        tracing::debug!(%question, value, answers = ?self.answers, "answer set");
        Ok(())
    }

    pub fn allowed_choices<'q>(&self, question: Question, questions: &'q QuestionSet) -> &'q [String] {
        match question {
            Question::Size => &questions.sizes,
            Question::Style => questions.allowed_styles(self.answers.size.as_deref()),
            Question::Video => questions.allowed_videos(self.answers.size.as_deref()),
        }
    }

    pub(crate) fn autofill_style(&mut self, questions: &QuestionSet) {
        if self.answers.size.is_none() || self.answers.style.is_some() {
            return;
        }
        if let [only] = questions.allowed_styles(self.answers.size.as_deref()) {
            tracing::debug!(style = %only, "single style allowed, auto-selected");
            self.answers.style = Some(only.clone());
        }
    }

    /// Adopts the cheapest option as the pick when none exists yet.
    pub fn ensure_default(&mut self, part: &str, resolver: &OptionResolver<'_>) -> Option<&Pick> {
        if !self.picks.contains_key(part) {
            let options = resolver.options_for(part, &self.answers);
            let first = options.first()?;
            tracing::debug!(part, pick = %first.name, "default pick adopted");
            self.picks.insert(part.to_string(), Pick::from(first));
        }
        self.picks.get(part)
    }

    pub fn set_pick(&mut self, part: impl AsRef<str>, option: &PartOption) {
        self.picks.insert(part.as_ref().to_string(), Pick::from(option));
    }

    pub fn clear_pick(&mut self, part: &str) -> Option<Pick> {
        self.picks.remove(part)
    }

    pub fn totals(&self) -> Totals {
        totals_of(self.picks.values())
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            step: self.step,
            answers: self.answers.clone(),
            picks: self.picks.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: ProgressSnapshot) {
        self.step = snapshot.step;
        self.answers = snapshot.answers.normalized();
        self.picks = snapshot.picks;
    }

    pub fn apply(&mut self, answers: AnswerTuple, picks: BTreeMap<String, Pick>) {
        self.answers = answers.normalized();
        self.picks = picks;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The step to show after a restore, never skipping an unanswered question.
    pub fn resume_step(&self) -> Step {
        let gap = self.answers.first_unanswered().map(Step::for_question);
        let has = |q| self.answers.get(q).is_some();
        match self.step {
            None | Some(Step::Part) | Some(Step::Results) => gap.unwrap_or(Step::Results),
            Some(Step::Size) => Step::Size,
            Some(Step::Style) if !has(Question::Size) => Step::Size,
            Some(Step::Style) => Step::Style,
            Some(Step::Video) => match gap {
                Some(earlier @ (Step::Size | Step::Style)) => earlier,
                _ => Step::Video,
            },
        }
    }
}

/// Price treats absent or non-finite values as 0; weight is unknown unless at
/// least one pick carries a known weight.
pub fn totals_of<'a>(picks: impl IntoIterator<Item = &'a Pick>) -> Totals {
    let mut total_price = 0.0;
    let mut weight_sum = 0.0;
    let mut any_weight = false;
    for pick in picks {
        total_price += sanitize_price(pick.price);
        if let Some(w) = known_weight(pick.weight) {
            weight_sum += w;
            any_weight = true;
        }
    }
    Totals {
        total_price,
        total_weight: any_weight.then_some(weight_sum),
    }
}
