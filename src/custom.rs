use crate::rule::RowRules;
use crate::store::{KeyValueStore, RecordList};
use crate::types::{de_price, de_text, de_weight, AnswerTuple, Origin, PartOption};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPartEntry {
    pub id: String,
    pub part: String,
    #[serde(flatten)]
    pub answers: AnswerTuple,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_text")]
    pub link: String,
    #[serde(default, deserialize_with = "de_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_weight")]
    pub weight: Option<f64>,
}

impl CustomPartEntry {
    /// Custom entries match their stored answers exactly, never by wildcard.
    pub fn is_visible_for(&self, answers: &AnswerTuple, part: &str) -> bool {
        self.part == part && RowRules::exact(&self.answers).applies(answers)
    }

    pub fn to_option(&self) -> PartOption {
        PartOption {
            name: self.name.clone(),
            price: self.price,
            weight: self.weight,
            link: self.link.clone(),
            origin: Origin::Custom,
            custom_id: Some(self.id.clone()),
        }
    }
}

pub fn visible_options(
    entries: &[CustomPartEntry],
    answers: &AnswerTuple,
    part: &str,
) -> Vec<PartOption> {
    entries
        .iter()
        .filter(|entry| entry.is_visible_for(answers, part))
        .map(CustomPartEntry::to_option)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Part,
    Name,
    Price,
    Link,
    Weight,
}

impl DraftField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Part => "part",
            Self::Name => "name",
            Self::Price => "price",
            Self::Link => "link",
            Self::Weight => "weight",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    NotANumber,
    OutOfRange,
    MalformedUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: DraftField,
    pub kind: IssueKind,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field.as_str(), self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid custom part: {}", render_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn fields(&self) -> Vec<DraftField> {
        self.issues.iter().map(|i| i.field).collect()
    }
}

fn render_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomPartError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("answer {0} before adding a custom part")]
    IncompleteAnswers(crate::types::Question),
    #[error("no custom part with id {0}")]
    NotFound(String),
}

/// Raw form input for a new custom part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomPartDraft {
    pub part: String,
    pub name: String,
    pub price: String,
    pub link: String,
    pub weight: String,
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl CustomPartDraft {
    pub fn new(part: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            part: part.as_ref().to_string(),
            name: name.as_ref().to_string(),
            ..Self::default()
        }
    }

    pub fn price(mut self, price: impl AsRef<str>) -> Self {
        self.price = price.as_ref().to_string();
        self
    }

    pub fn link(mut self, link: impl AsRef<str>) -> Self {
        self.link = link.as_ref().to_string();
        self
    }

    pub fn weight(mut self, weight: impl AsRef<str>) -> Self {
        self.weight = weight.as_ref().to_string();
        self
    }

    /// Validates every field, reporting all offending ones at once.
    pub fn validate(&self, answers: &AnswerTuple) -> Result<CustomPartEntry, ValidationError> {
        let mut issues = Vec::new();
        let mut issue = |field, kind, message: &str| {
            issues.push(FieldIssue {
                field,
                kind,
                message: message.to_string(),
            })
        };

        let part = self.part.trim();
        if part.is_empty() {
            issue(DraftField::Part, IssueKind::Missing, "part category is required");
        }
        let name = self.name.trim();
        if name.is_empty() {
            issue(DraftField::Name, IssueKind::Missing, "name is required");
        }

        let raw_price = self.price.trim();
        let price = if raw_price.is_empty() {
            0.0
        } else {
            match parse_number(raw_price) {
                Some(v) if v >= 0.0 => v,
                Some(_) => {
                    issue(DraftField::Price, IssueKind::OutOfRange, "price must not be negative");
                    0.0
                }
                None => {
                    issue(DraftField::Price, IssueKind::NotANumber, "price must be a number");
                    0.0
                }
            }
        };

        let link = self.link.trim();
        if !link.is_empty() && !is_http_url(link) {
            issue(
                DraftField::Link,
                IssueKind::MalformedUrl,
                "link must be an http(s) URL",
            );
        }

        let raw_weight = self.weight.trim();
        let weight = if raw_weight.is_empty() {
            None
        } else {
            match parse_number(raw_weight) {
                Some(v) if v > 0.0 => Some(v),
                // Zero grams means unknown.
                Some(v) if v == 0.0 => None,
                Some(_) => {
                    issue(DraftField::Weight, IssueKind::OutOfRange, "weight must not be negative");
                    None
                }
                None => {
                    issue(DraftField::Weight, IssueKind::NotANumber, "weight must be a number");
                    None
                }
            }
        };

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }
        Ok(CustomPartEntry {
            id: uuid::Uuid::new_v4().simple().to_string(),
            part: part.to_string(),
            answers: answers.clone(),
            name: name.to_string(),
            link: link.to_string(),
            price,
            weight,
        })
    }
}

/// CRUD over the persisted custom-part list, newest first.
#[derive(Debug, Clone)]
pub struct CustomPartStore {
    key: String,
}

impl CustomPartStore {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self {
            key: key.as_ref().to_string(),
        }
    }

    pub fn list(&self, store: &dyn KeyValueStore) -> Vec<CustomPartEntry> {
        RecordList::load(store, &self.key).into_parsed()
    }

    pub fn add(&self, store: &mut dyn KeyValueStore, entry: CustomPartEntry) {
        let mut entries = RecordList::load(store, &self.key);
        tracing::info!(id = %entry.id, part = %entry.part, name = %entry.name, "custom part added");
        entries.prepend(entry);
        entries.persist(store, &self.key);
    }

    pub fn remove(&self, store: &mut dyn KeyValueStore, id: &str) -> Option<CustomPartEntry> {
        let mut entries = RecordList::<CustomPartEntry>::load(store, &self.key);
        let removed = entries.remove_where(|e| e.id == id)?;
        entries.persist(store, &self.key);
        tracing::info!(id, part = %removed.part, "custom part removed");
        Some(removed)
    }

    pub fn visible_for(
        &self,
        store: &dyn KeyValueStore,
        answers: &AnswerTuple,
        part: &str,
    ) -> Vec<PartOption> {
        visible_options(&self.list(store), answers, part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const KEY: &str = "custom";

    fn five_inch() -> AnswerTuple {
        AnswerTuple::complete("5\"", "Freestyle", "Analog")
    }

    #[test]
    fn valid_draft_produces_entry() {
        let entry = CustomPartDraft::new("Frame", "  Quadmula Split 3 ")
            .price("79.99")
            .link("https://quadmula.com/split3")
            .weight("106")
            .validate(&five_inch())
            .unwrap();
        assert_eq!(entry.name, "Quadmula Split 3");
        assert_eq!(entry.price, 79.99);
        assert_eq!(entry.weight, Some(106.0));
        assert_eq!(entry.answers, five_inch());
        assert_eq!(entry.id.len(), 32);
    }

    #[test]
    fn blank_optional_fields_use_defaults() {
        let entry = CustomPartDraft::new("Frame", "Bare")
            .weight("0")
            .validate(&five_inch())
            .unwrap();
        assert_eq!(entry.price, 0.0);
        assert_eq!(entry.weight, None);
        assert_eq!(entry.link, "");
    }

    #[test]
    fn validation_enumerates_every_offending_field() {
        let err = CustomPartDraft::new("Frame", "   ")
            .price("cheap")
            .link("ftp://example.com/file")
            .weight("-4")
            .validate(&five_inch())
            .unwrap_err();
        assert_eq!(
            err.fields(),
            vec![
                DraftField::Name,
                DraftField::Price,
                DraftField::Link,
                DraftField::Weight
            ]
        );
        assert_eq!(err.issues[3].kind, IssueKind::OutOfRange);
        assert!(err.to_string().contains("name: name is required"));
    }

    #[test]
    fn link_validation_accepts_http_and_rejects_garbage() {
        for ok in [
            "http://example.com",
            "https://shop.runcam.com/phoenix?x=1",
            "HTTPS://a.b:8080/",
            "https://user@host.example/",
        ] {
            assert!(is_http_url(ok), "{ok}");
        }
        for bad in [
            "example.com",
            "https://",
            "https://exa mple.com",
            "0",
            "javascript:alert(1)",
            "ftp://example.com/file",
        ] {
            assert!(!is_http_url(bad), "{bad}");
        }
    }

    #[test]
    fn add_prepends_and_remove_filters() {
        let mut kv = MemoryStore::new();
        let customs = CustomPartStore::new(KEY);
        let first = CustomPartDraft::new("Frame", "A").validate(&five_inch()).unwrap();
        let second = CustomPartDraft::new("Frame", "B").validate(&five_inch()).unwrap();
        customs.add(&mut kv, first.clone());
        customs.add(&mut kv, second.clone());

        let names: Vec<String> = customs.list(&kv).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["B", "A"]);

        let removed = customs.remove(&mut kv, &first.id).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(customs.list(&kv), vec![second]);
        assert!(customs.remove(&mut kv, "missing").is_none());
    }

    #[test]
    fn visibility_is_scoped_to_exact_answers_and_part() {
        let mut kv = MemoryStore::new();
        let customs = CustomPartStore::new(KEY);
        let entry = CustomPartDraft::new("Frame", "Mine").validate(&five_inch()).unwrap();
        customs.add(&mut kv, entry);

        assert_eq!(customs.visible_for(&kv, &five_inch(), "Frame").len(), 1);
        assert!(customs.visible_for(&kv, &five_inch(), "Motors").is_empty());
        let dji = AnswerTuple::complete("5\"", "Freestyle", "DJI");
        assert!(customs.visible_for(&kv, &dji, "Frame").is_empty());

        let option = &customs.visible_for(&kv, &five_inch(), "Frame")[0];
        assert_eq!(option.origin, Origin::Custom);
        assert!(option.custom_id.is_some());
    }

    #[test]
    fn legacy_flat_records_load() {
        let mut kv = MemoryStore::new();
        kv.insert_raw(
            KEY,
            r#"[{"id":"abc","part":"Frame","size":"5\"","style":"Freestyle","video":"Analog",
                "name":"Old","link":"","price":12,"weight":null}]"#,
        );
        let entries = CustomPartStore::new(KEY).list(&kv);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].answers, five_inch());
        assert_eq!(entries[0].price, 12.0);
    }

    #[test]
    fn corrupt_storage_lists_nothing() {
        let mut kv = MemoryStore::new();
        kv.insert_raw(KEY, "definitely not json");
        assert!(CustomPartStore::new(KEY).list(&kv).is_empty());
    }

    #[test]
    fn unreadable_records_are_skipped_but_kept_on_write() {
        let mut kv = MemoryStore::new();
        kv.insert_raw(
            KEY,
            r#"[{"id":"good","part":"Frame","size":"5\"","style":"Freestyle","video":"Analog","name":"Mine","price":10},
                {"id":"bad","part":null,"name":"Broken"}]"#,
        );
        let customs = CustomPartStore::new(KEY);
        let listed = customs.list(&kv);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Mine");

        let added = CustomPartDraft::new("Motors", "New").validate(&five_inch()).unwrap();
        customs.add(&mut kv, added.clone());
        let names: Vec<String> = customs.list(&kv).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["New", "Mine"]);

        customs.remove(&mut kv, &added.id).unwrap();
        let value: serde_json::Value = serde_json::from_str(kv.raw(KEY).unwrap()).unwrap();
        let ids: Vec<&str> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["good", "bad"]);
    }
}
