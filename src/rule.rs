use crate::types::{AnswerTuple, Question};
use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

/// Token that makes a rule match every candidate, including an unset one.
pub const WILDCARD: &str = "Any";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Any,
    Exact(String),
    OneOf(Vec<String>),
}

impl Rule {
    pub fn exact(value: impl AsRef<str>) -> Self {
        Self::Exact(value.as_ref().to_string())
    }

    pub fn one_of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self::OneOf(values.into_iter().map(|v| v.as_ref().to_string()).collect())
    }

    pub fn matches(&self, candidate: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(value) => candidate == Some(value.as_str()),
            Self::OneOf(values) => {
                candidate.is_some_and(|c| values.iter().any(|v| v.as_str() == c))
            }
        }
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Any => serializer.serialize_str(WILDCARD),
            Self::Exact(value) => serializer.serialize_str(value),
            Self::OneOf(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRule {
            Text(String),
            List(Vec<String>),
        }

        match RawRule::deserialize(deserializer)
            .map_err(|_| D::Error::custom("rule must be a string or a list of strings"))?
        {
            RawRule::Text(value) if value == WILDCARD => Ok(Rule::Any),
            RawRule::Text(value) => Ok(Rule::Exact(value)),
            RawRule::List(values) => Ok(Rule::OneOf(values)),
        }
    }
}

/// An absent rule never matches: the row is inapplicable for that dimension.
pub fn matches(rule: Option<&Rule>, candidate: Option<&str>) -> bool {
    rule.is_some_and(|r| r.matches(candidate))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRules {
    pub size: Option<Rule>,
    pub style: Option<Rule>,
    pub video: Option<Rule>,
}

impl RowRules {
    pub fn new(size: Option<Rule>, style: Option<Rule>, video: Option<Rule>) -> Self {
        Self { size, style, video }
    }

    /// Rules that only accept exactly these answers; unset answers never match.
    pub fn exact(answers: &AnswerTuple) -> Self {
        Self {
            size: answers.size.as_ref().map(Rule::exact),
            style: answers.style.as_ref().map(Rule::exact),
            video: answers.video.as_ref().map(Rule::exact),
        }
    }

    pub fn get(&self, question: Question) -> Option<&Rule> {
        match question {
            Question::Size => self.size.as_ref(),
            Question::Style => self.style.as_ref(),
            Question::Video => self.video.as_ref(),
        }
    }

    /// All three dimensions must pass independently.
    pub fn applies(&self, answers: &AnswerTuple) -> bool {
        Question::ALL
            .iter()
            .all(|q| matches(self.get(*q), answers.get(*q)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything_including_unset() {
        for candidate in [None, Some(""), Some("5\""), Some("Any")] {
            assert!(Rule::Any.matches(candidate));
        }
    }

    #[test]
    fn absent_rule_never_matches() {
        assert!(!matches(None, Some("5\"")));
        assert!(!matches(None, None));
    }

    #[test]
    fn set_rule_requires_membership() {
        let rule = Rule::one_of(["5\"", "3\""]);
        assert!(rule.matches(Some("3\"")));
        assert!(!rule.matches(Some("7\"")));
        assert!(!rule.matches(None));
    }

    #[test]
    fn scalar_and_singleton_set_behave_identically() {
        let scalar = Rule::exact("Analog");
        let singleton = Rule::one_of(["Analog"]);
        for candidate in [None, Some("Analog"), Some("analog"), Some("DJI")] {
            assert_eq!(scalar.matches(candidate), singleton.matches(candidate));
        }
    }

    #[test]
    fn wildcard_token_inside_a_set_is_literal() {
        let rule = Rule::one_of(["Any"]);
        assert!(!rule.matches(Some("Freestyle")));
    }

    #[test]
    fn rules_deserialize_from_both_shapes() {
        let any: Rule = serde_json::from_str("\"Any\"").unwrap();
        let exact: Rule = serde_json::from_str("\"DJI\"").unwrap();
        let set: Rule = serde_json::from_str("[\"5\\\"\",\"7\\\"\"]").unwrap();
        assert_eq!(any, Rule::Any);
        assert_eq!(exact, Rule::exact("DJI"));
        assert_eq!(set, Rule::one_of(["5\"", "7\""]));
        assert!(serde_json::from_str::<Rule>("42").is_err());
    }

    #[test]
    fn row_applies_only_when_every_dimension_passes() {
        let rules = RowRules::new(
            Some(Rule::one_of(["5\""])),
            Some(Rule::Any),
            Some(Rule::exact("Analog")),
        );
        assert!(rules.applies(&AnswerTuple::complete("5\"", "Racing", "Analog")));
        assert!(!rules.applies(&AnswerTuple::complete("5\"", "Racing", "DJI")));

        let missing_video = RowRules::new(Some(Rule::Any), Some(Rule::Any), None);
        assert!(!missing_video.applies(&AnswerTuple::complete("5\"", "Racing", "DJI")));
    }

    #[test]
    fn exact_rules_do_not_match_unset_answers() {
        let stored = AnswerTuple::new(Some("5\"".to_string()), None, None);
        let rules = RowRules::exact(&stored);
        assert!(!rules.applies(&stored));
        let full = AnswerTuple::complete("5\"", "Freestyle", "Analog");
        assert!(RowRules::exact(&full).applies(&full));
    }
}
