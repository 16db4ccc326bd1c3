use crate::selection::SelectionState;
use crate::store::{KeyValueStore, RecordList};
use crate::types::{de_text, AnswerTuple, Pick, Question, Totals};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    #[error("cannot save a build before answering {0}")]
    IncompleteAnswers(Question),
    #[error("build name must not be empty")]
    EmptyName,
    #[error("no saved build with id {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildEntry {
    pub id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub answers: AnswerTuple,
    #[serde(default)]
    pub picks: BTreeMap<String, Pick>,
    #[serde(default)]
    pub totals: Totals,
}

impl BuildEntry {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Untitled build"
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildArchive {
    key: String,
}

impl BuildArchive {
    pub fn new(key: impl AsRef<str>) -> Self {
        Self {
            key: key.as_ref().to_string(),
        }
    }

    pub fn list(&self, store: &dyn KeyValueStore) -> Vec<BuildEntry> {
        RecordList::load(store, &self.key).into_parsed()
    }

    /// Captures the state as a new entry; rejected unless every answer is set.
    pub fn save(
        &self,
        store: &mut dyn KeyValueStore,
        name: &str,
        state: &SelectionState,
    ) -> Result<BuildEntry, ArchiveError> {
        self.save_at(store, name, state, Utc::now())
    }

    pub fn save_at(
        &self,
        store: &mut dyn KeyValueStore,
        name: &str,
        state: &SelectionState,
        now: DateTime<Utc>,
    ) -> Result<BuildEntry, ArchiveError> {
        if let Some(missing) = state.answers().first_unanswered() {
            return Err(ArchiveError::IncompleteAnswers(missing));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ArchiveError::EmptyName);
        }

        let entry = BuildEntry {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            // Stored with millisecond precision.
            created_at: now.trunc_subsecs(3),
            answers: state.answers().clone(),
            picks: state.picks().clone(),
            totals: state.totals(),
        };
        let mut builds = RecordList::load(store, &self.key);
        builds.prepend(entry.clone());
        builds.persist(store, &self.key);
        tracing::info!(id = %entry.id, name = %entry.name, "build saved");
        Ok(entry)
    }

    /// Looks up an entry; applying it to a selection is the caller's job.
    pub fn load_by_id(
        &self,
        store: &dyn KeyValueStore,
        id: &str,
    ) -> Result<BuildEntry, ArchiveError> {
        RecordList::<BuildEntry>::load(store, &self.key)
            .into_parsed()
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| ArchiveError::NotFound(id.to_string()))
    }

    pub fn delete_by_id(
        &self,
        store: &mut dyn KeyValueStore,
        id: &str,
    ) -> Result<BuildEntry, ArchiveError> {
        let mut builds = RecordList::<BuildEntry>::load(store, &self.key);
        let removed = builds
            .remove_where(|b| b.id == id)
            .ok_or_else(|| ArchiveError::NotFound(id.to_string()))?;
        builds.persist(store, &self.key);
        tracing::info!(id, name = %removed.name, "build deleted");
        Ok(removed)
    }
}
