pub mod archive;
pub mod catalog;
pub mod config;
pub mod custom;
pub mod error;
pub mod format;
pub mod resolver;
pub mod rule;
pub mod selection;
pub mod session;
pub mod store;
pub mod types;

pub use archive::{ArchiveError, BuildArchive, BuildEntry};
pub use catalog::{Catalog, CatalogError, CatalogRow, QuestionSet};
pub use config::Config;
pub use custom::{CustomPartDraft, CustomPartEntry, CustomPartError, CustomPartStore, ValidationError};
pub use error::{Error, Result};
pub use resolver::OptionResolver;
pub use rule::{Rule, RowRules};
pub use selection::{SelectionError, SelectionState, Step};
pub use session::{BuildSummary, Configurator, SummaryRow};
pub use store::{FileStore, KeyValueStore, MemoryStore, StorageKeys, StoreError};
pub use types::{AnswerTuple, Origin, PartOption, Pick, Question, Totals};
