use crate::rule::{Rule, RowRules};
use crate::types::{de_price, de_text, de_weight, AnswerTuple};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../catalog/drone_parts.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml parse failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported catalog extension '{0}'; expected .yaml/.yml/.json")]
    UnsupportedExtension(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogOption {
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub link: String,
    #[serde(default, deserialize_with = "de_weight")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRow {
    part: String,
    #[serde(default)]
    options: Vec<CatalogOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sizes: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    styles: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video: Option<Rule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    videos: Option<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRow", into = "RawRow")]
pub struct CatalogRow {
    pub part: String,
    pub tier: Option<String>,
    pub rules: RowRules,
    pub options: Vec<CatalogOption>,
}

impl From<RawRow> for CatalogRow {
    fn from(raw: RawRow) -> Self {
        // The plural field wins when a row carries both.
        Self {
            part: raw.part,
            tier: raw.tier,
            rules: RowRules::new(
                raw.sizes.or(raw.size),
                raw.styles.or(raw.style),
                raw.videos.or(raw.video),
            ),
            options: raw.options,
        }
    }
}

impl From<CatalogRow> for RawRow {
    fn from(row: CatalogRow) -> Self {
        Self {
            part: row.part,
            options: row.options,
            tier: row.tier,
            size: None,
            sizes: row.rules.size,
            style: None,
            styles: row.rules.style,
            video: None,
            videos: row.rules.video,
        }
    }
}

impl CatalogRow {
    pub fn new(part: impl AsRef<str>, rules: RowRules, options: Vec<CatalogOption>) -> Self {
        Self {
            part: part.as_ref().to_string(),
            tier: None,
            rules,
            options,
        }
    }

    pub fn applies(&self, answers: &AnswerTuple) -> bool {
        self.rules.applies(answers)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    pub sizes: Vec<String>,
    pub styles: Vec<String>,
    pub videos: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub styles_by_size: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub videos_by_size: BTreeMap<String, Vec<String>>,
}

impl Default for QuestionSet {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            sizes: owned(&["65mm", "2\"", "3\"", "3.5\"", "5\""]),
            styles: owned(&["Freestyle", "Racing", "Cinematic"]),
            videos: owned(&["Analog", "DJI", "HDZero", "Walksnail"]),
            styles_by_size: BTreeMap::new(),
            videos_by_size: BTreeMap::new(),
        }
    }
}

impl QuestionSet {
    pub fn allowed_styles(&self, size: Option<&str>) -> &[String] {
        size.and_then(|s| self.styles_by_size.get(s))
            .map(Vec::as_slice)
            .unwrap_or(&self.styles)
    }

    pub fn allowed_videos(&self, size: Option<&str>) -> &[String] {
        size.and_then(|s| self.videos_by_size.get(s))
            .map(Vec::as_slice)
            .unwrap_or(&self.videos)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    Full {
        #[serde(default)]
        questions: QuestionSet,
        rows: Vec<CatalogRow>,
    },
    Rows(Vec<CatalogRow>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "CatalogDocument")]
pub struct Catalog {
    pub questions: QuestionSet,
    pub rows: Vec<CatalogRow>,
}

impl From<CatalogDocument> for Catalog {
    fn from(doc: CatalogDocument) -> Self {
        match doc {
            CatalogDocument::Full { questions, rows } => Self { questions, rows },
            CatalogDocument::Rows(rows) => Self {
                questions: QuestionSet::default(),
                rows,
            },
        }
    }
}

impl Catalog {
    pub fn new(questions: QuestionSet, rows: Vec<CatalogRow>) -> Self {
        Self { questions, rows }
    }

    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_CATALOG)
    }

    pub fn from_json_str(input: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path_ref = path.as_ref();
        let raw = fs::read_to_string(path_ref).map_err(|source| CatalogError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;
        let ext = path_ref
            .extension()
            .and_then(|v| v.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let catalog = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&raw)?,
            "json" => Self::from_json_str(&raw)?,
            _ => return Err(CatalogError::UnsupportedExtension(ext)),
        };
        tracing::debug!(
            path = %path_ref.display(),
            rows = catalog.rows.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    pub fn rows_for<'a>(
        &'a self,
        answers: &'a AnswerTuple,
    ) -> impl Iterator<Item = &'a CatalogRow> + 'a {
        self.rows.iter().filter(move |row| row.applies(answers))
    }

    /// Distinct part categories required for these answers, first-seen order.
    pub fn parts_for(&self, answers: &AnswerTuple) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows_for(answers)
            .filter(|row| seen.insert(row.part.as_str()))
            .map(|row| row.part.clone())
            .collect()
    }

    pub fn all_parts(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter(|row| seen.insert(row.part.as_str()))
            .map(|row| row.part.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture() -> Catalog {
        let path = format!("{}/catalog/drone_parts.json", env!("CARGO_MANIFEST_DIR"));
        Catalog::from_path(path).expect("catalog should load")
    }

    #[test]
    fn both_field_conventions_normalise_to_the_same_rules() {
        let singular = r#"[{"part":"Frame","size":"5\"","style":"Any","video":"DJI","options":[]}]"#;
        let plural =
            r#"[{"part":"Frame","sizes":["5\""],"styles":"Any","videos":["DJI"],"options":[]}]"#;
        let a = Catalog::from_json_str(singular).unwrap();
        let b = Catalog::from_json_str(plural).unwrap();
        let answers = AnswerTuple::complete("5\"", "Racing", "DJI");
        assert_eq!(a.parts_for(&answers), vec!["Frame"]);
        assert_eq!(b.parts_for(&answers), vec!["Frame"]);
        assert_eq!(a.rows[0].rules.style, Some(Rule::Any));
        assert_eq!(b.rows[0].rules.size, Some(Rule::one_of(["5\""])));
    }

    #[test]
    fn plural_field_wins_over_singular() {
        let raw = r#"[{"part":"Frame","size":"7\"","sizes":["5\""],"styles":"Any","videos":"Any"}]"#;
        let catalog = Catalog::from_json_str(raw).unwrap();
        assert_eq!(catalog.rows[0].rules.size, Some(Rule::one_of(["5\""])));
    }

    #[test]
    fn row_without_a_dimension_never_applies() {
        let raw = r#"[{"part":"Frame","sizes":"Any","styles":"Any"}]"#;
        let catalog = Catalog::from_json_str(raw).unwrap();
        let answers = AnswerTuple::complete("5\"", "Racing", "DJI");
        assert!(catalog.parts_for(&answers).is_empty());
    }

    #[test]
    fn negative_catalog_prices_are_clamped() {
        let raw = r#"[{"part":"Frame","sizes":"Any","styles":"Any","videos":"Any",
            "options":[{"name":"Glitch","price":-40},{"name":"Real","price":20}]}]"#;
        let catalog = Catalog::from_json_str(raw).unwrap();
        let prices: Vec<f64> = catalog.rows[0].options.iter().map(|o| o.price).collect();
        assert_eq!(prices, vec![0.0, 20.0]);
    }

    #[test]
    fn bundled_catalog_matches_file_on_disk() {
        assert_eq!(Catalog::bundled().unwrap(), load_fixture());
    }

    #[test]
    fn five_inch_analog_build_requires_expected_parts() {
        let catalog = load_fixture();
        let answers = AnswerTuple::complete("5\"", "Freestyle", "Analog");
        let parts: HashSet<String> = catalog.parts_for(&answers).into_iter().collect();
        for expected in [
            "Frame",
            "Motors",
            "FC & ESC Stack",
            "Reciever",
            "Video Transmitter (Analog)",
            "Analog Camera",
            "Battery",
        ] {
            assert!(parts.contains(expected), "missing {expected}");
        }
        assert!(!parts.contains("Prebuilt"));
    }

    #[test]
    fn rows_for_unset_answers_only_returns_wildcard_rows() {
        let catalog = load_fixture();
        let parts = catalog.parts_for(&AnswerTuple::default());
        assert_eq!(parts, vec!["Reciever"]);
    }

    #[test]
    fn yaml_catalog_with_questions_loads() {
        let raw = r#"
questions:
  sizes: ["3\""]
  styles: ["Freestyle"]
  videos: ["DJI"]
rows:
  - part: Frame
    size: '3"'
    style: Any
    video: Any
    options:
      - { name: "Source One 3", price: 25, weight: 40 }
"#;
        let catalog = Catalog::from_yaml_str(raw).unwrap();
        assert_eq!(catalog.questions.sizes, vec!["3\""]);
        assert_eq!(catalog.rows[0].options[0].weight, Some(40.0));
        assert_eq!(catalog.rows[0].options[0].link, "");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.txt");
        fs::write(&path, "[]").unwrap();
        let err = Catalog::from_path(&path).unwrap_err();
        assert!(matches!(err, CatalogError::UnsupportedExtension(ext) if ext == "txt"));
    }

    #[test]
    fn per_size_style_restrictions_fall_back_to_full_list() {
        let mut questions = QuestionSet::default();
        questions
            .styles_by_size
            .insert("65mm".to_string(), vec!["Freestyle".to_string()]);
        assert_eq!(questions.allowed_styles(Some("65mm")), ["Freestyle".to_string()]);
        assert_eq!(questions.allowed_styles(Some("5\"")).len(), 3);
        assert_eq!(questions.allowed_styles(None).len(), 3);
    }
}
