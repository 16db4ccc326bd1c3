use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Question {
    Size,
    Style,
    Video,
}

impl Question {
    pub const ALL: [Question; 3] = [Question::Size, Question::Style, Question::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Style => "style",
            Self::Video => "video",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "size" | "sizes" => Some(Self::Size),
            "style" | "styles" => Some(Self::Style),
            "video" | "videos" | "vtx" => Some(Self::Video),
            _ => None,
        }
    }

    pub fn later(self) -> &'static [Question] {
        match self {
            Self::Size => &[Question::Style, Question::Video],
            Self::Style => &[Question::Video],
            Self::Video => &[],
        }
    }

    pub fn earlier(self) -> &'static [Question] {
        match self {
            Self::Size => &[],
            Self::Style => &[Question::Size],
            Self::Video => &[Question::Size, Question::Style],
        }
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (size, style, video-system) triple driving all filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnswerTuple {
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
}

impl AnswerTuple {
    pub fn new(size: Option<String>, style: Option<String>, video: Option<String>) -> Self {
        Self { size, style, video }
    }

    pub fn complete(size: &str, style: &str, video: &str) -> Self {
        Self::new(
            Some(size.to_string()),
            Some(style.to_string()),
            Some(video.to_string()),
        )
    }

    pub fn get(&self, question: Question) -> Option<&str> {
        match question {
            Question::Size => self.size.as_deref(),
            Question::Style => self.style.as_deref(),
            Question::Video => self.video.as_deref(),
        }
    }

    pub(crate) fn slot_mut(&mut self, question: Question) -> &mut Option<String> {
        match question {
            Question::Size => &mut self.size,
            Question::Style => &mut self.style,
            Question::Video => &mut self.video,
        }
    }

    pub fn is_complete(&self) -> bool {
        Question::ALL.iter().all(|q| self.get(*q).is_some())
    }

    pub fn first_unanswered(&self) -> Option<Question> {
        Question::ALL.into_iter().find(|q| self.get(*q).is_none())
    }

    /// Empty strings are treated as unset.
    pub(crate) fn normalized(mut self) -> Self {
        for q in Question::ALL {
            let slot = self.slot_mut(q);
            if slot.as_deref().is_some_and(str::is_empty) {
                *slot = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionKey(String);

impl OptionKey {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Catalog,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOption {
    pub name: String,
    #[serde(default, deserialize_with = "de_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_weight")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "de_text")]
    pub link: String,
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
}

impl PartOption {
    pub fn key(&self) -> OptionKey {
        OptionKey::new(&self.name)
    }

    pub fn known_weight(&self) -> Option<f64> {
        known_weight(self.weight)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    #[serde(default, deserialize_with = "de_text")]
    pub name: String,
    #[serde(default, deserialize_with = "de_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub link: String,
    #[serde(default, deserialize_with = "de_weight")]
    pub weight: Option<f64>,
}

impl Pick {
    pub fn key(&self) -> OptionKey {
        OptionKey::new(&self.name)
    }

    pub fn known_weight(&self) -> Option<f64> {
        known_weight(self.weight)
    }
}

impl From<&PartOption> for Pick {
    fn from(option: &PartOption) -> Self {
        Self {
            name: option.name.clone(),
            price: sanitize_price(option.price),
            link: option.link.clone(),
            weight: option.weight,
        }
    }
}

/// Aggregated price and weight of a set of picks.
///
/// `total_weight` is `None` ("unknown") when no pick carried a known weight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    #[serde(default, deserialize_with = "de_price")]
    pub total_price: f64,
    #[serde(default, deserialize_with = "de_weight")]
    pub total_weight: Option<f64>,
}

/// Prices are never negative; non-finite and negative values read as 0.
pub(crate) fn sanitize_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}

pub(crate) fn known_weight(weight: Option<f64>) -> Option<f64> {
    weight.filter(|w| w.is_finite() && *w > 0.0)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(raw) => raw.trim().parse::<f64>().ok(),
        }
    }
}

pub(crate) fn de_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Numeric>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|n| n.to_f64())
        .map(sanitize_price)
        .unwrap_or(0.0))
}

pub(crate) fn de_weight<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Numeric>::deserialize(deserializer)?;
    Ok(raw.and_then(|n| n.to_f64()))
}

pub(crate) fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextLike {
        Text(String),
        Number(f64),
    }

    Ok(match Option::<TextLike>::deserialize(deserializer)? {
        Some(TextLike::Text(v)) => v,
        Some(TextLike::Number(v)) => v.to_string(),
        None => String::new(),
    })
}
