use crate::archive::{BuildArchive, BuildEntry};
use crate::catalog::Catalog;
use crate::custom::{CustomPartDraft, CustomPartEntry, CustomPartError, CustomPartStore};
use crate::error::{Error, Result};
use crate::resolver::OptionResolver;
use crate::selection::{ProgressSnapshot, SelectionState, Step};
use crate::store::{self, KeyValueStore, StorageKeys};
use crate::types::{AnswerTuple, OptionKey, PartOption, Pick, Question, Totals};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub part: String,
    pub pick: Option<Pick>,
    pub options: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    #[serde(flatten)]
    pub answers: AnswerTuple,
    pub rows: Vec<SummaryRow>,
    pub totals: Totals,
}

pub struct Configurator<S: KeyValueStore> {
    catalog: Catalog,
    store: S,
    keys: StorageKeys,
    custom: CustomPartStore,
    archive: BuildArchive,
    state: SelectionState,
}

impl<S: KeyValueStore> Configurator<S> {
    pub fn new(catalog: Catalog, store: S) -> Self {
        Self::with_keys(catalog, store, StorageKeys::default())
    }

    pub fn with_keys(catalog: Catalog, store: S, keys: StorageKeys) -> Self {
        let mut state = SelectionState::new();
        if let Some(snapshot) = store::load_optional::<ProgressSnapshot>(&store, &keys.progress) {
            state.restore(snapshot);
            state.autofill_style(&catalog.questions);
            let step = state.resume_step();
            state.set_step(step);
            tracing::debug!(answers = ?state.answers(), ?step, "progress restored");
        }
        Self {
            custom: CustomPartStore::new(&keys.custom_parts),
            archive: BuildArchive::new(&keys.saved_builds),
            catalog,
            store,
            keys,
            state,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn step(&self) -> Step {
        self.state.resume_step()
    }

    pub fn allowed_choices(&self, question: Question) -> &[String] {
        self.state.allowed_choices(question, &self.catalog.questions)
    }

    /// Answers one question and advances to the next unanswered step.
    pub fn answer(&mut self, question: Question, value: &str) -> Result<()> {
        self.state
            .set_answer(question, value, &self.catalog.questions)?;
        let next = self
            .state
            .answers()
            .first_unanswered()
            .map(Step::for_question)
            .unwrap_or(Step::Results);
        self.state.set_step(next);
        self.persist_progress();
        Ok(())
    }

    pub fn parts(&self) -> Vec<String> {
        self.catalog.parts_for(self.state.answers())
    }

    pub fn options_for(&self, part: &str) -> Vec<PartOption> {
        let custom = self.custom.list(&self.store);
        OptionResolver::new(&self.catalog, &custom).options_for(part, self.state.answers())
    }

    pub fn resolve(&mut self) -> BuildSummary {
        let custom = self.custom.list(&self.store);
        let resolver = OptionResolver::new(&self.catalog, &custom);
        let parts = self.catalog.parts_for(self.state.answers());

        let mut rows = Vec::with_capacity(parts.len());
        for part in parts {
            let options = resolver.options_for(&part, self.state.answers()).len();
            let pick = self.state.ensure_default(&part, &resolver).cloned();
            rows.push(SummaryRow { part, pick, options });
        }
        let summary = BuildSummary {
            answers: self.state.answers().clone(),
            rows,
            totals: self.state.totals(),
        };
        self.persist_progress();
        summary
    }

    /// Selects the option named `option` (case-insensitive) for `part`.
    pub fn pick(&mut self, part: &str, option: &str) -> Result<&Pick> {
        let options = self.options_for(part);
        if options.is_empty() && !self.parts().iter().any(|p| p == part) {
            return Err(Error::UnknownPart(part.to_string()));
        }
        let wanted = OptionKey::new(option);
        let chosen = options
            .iter()
            .find(|o| o.key() == wanted)
            .ok_or_else(|| Error::UnknownOption {
                part: part.to_string(),
                option: option.to_string(),
            })?;
        self.state.set_pick(part, chosen);
        self.state.set_step(Step::Results);
        tracing::debug!(part, pick = %chosen.name, "option picked");
        self.persist_progress();
        self.state
            .pick(part)
            .ok_or_else(|| Error::UnknownPart(part.to_string()))
    }

    pub fn custom_parts(&self) -> Vec<CustomPartEntry> {
        self.custom.list(&self.store)
    }

    pub fn add_custom_part(&mut self, draft: &CustomPartDraft) -> Result<CustomPartEntry> {
        if let Some(missing) = self.state.answers().first_unanswered() {
            return Err(CustomPartError::IncompleteAnswers(missing).into());
        }
        let entry = draft.validate(self.state.answers())?;
        self.custom.add(&mut self.store, entry.clone());
        Ok(entry)
    }

    /// Removes a custom part; the active pick is dropped once no remaining option offers it.
    pub fn delete_custom_part(&mut self, id: &str) -> Result<CustomPartEntry> {
        let removed = self
            .custom
            .remove(&mut self.store, id)
            .ok_or_else(|| CustomPartError::NotFound(id.to_string()))?;

        let orphaned = removed.is_visible_for(self.state.answers(), &removed.part)
            && self.state.pick(&removed.part).is_some_and(|pick| {
                pick.key() == OptionKey::new(&removed.name)
                    && !self
                        .options_for(&removed.part)
                        .iter()
                        .map(Pick::from)
                        .any(|o| o.key() == pick.key() && o.price == pick.price && o.link == pick.link)
            });
        if orphaned {
            self.state.clear_pick(&removed.part);
            tracing::debug!(part = %removed.part, "pick cleared with its custom part");
            self.persist_progress();
        }
        Ok(removed)
    }

    pub fn save_build(&mut self, name: &str) -> Result<BuildEntry> {
        Ok(self.archive.save(&mut self.store, name, &self.state)?)
    }

    pub fn builds(&self) -> Vec<BuildEntry> {
        self.archive.list(&self.store)
    }

    /// Makes a saved build the current selection and jumps to the results.
    pub fn load_build(&mut self, id: &str) -> Result<BuildEntry> {
        let entry = self.archive.load_by_id(&self.store, id)?;
        self.state.apply(entry.answers.clone(), entry.picks.clone());
        self.state.set_step(Step::Results);
        tracing::info!(id, name = %entry.name, "build loaded");
        self.persist_progress();
        Ok(entry)
    }

    pub fn delete_build(&mut self, id: &str) -> Result<BuildEntry> {
        Ok(self.archive.delete_by_id(&mut self.store, id)?)
    }

    pub fn restart(&mut self) {
        self.state.reset();
        store::forget(&mut self.store, &self.keys.progress);
        tracing::info!("selection restarted");
    }

    pub fn totals(&self) -> Totals {
        self.state.totals()
    }

    fn persist_progress(&mut self) {
        store::persist(&mut self.store, &self.keys.progress, &self.state.snapshot());
    }
}
