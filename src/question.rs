/**
 * Data structures for exam questions: the raw records handed over by question pools
 * and by the selection step, and the normalized `Question` the sequencer works with.
 *
 * Version: October 2026
 */
use std::convert::TryFrom;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// Topics of the "Genel Bankacılık" section.
pub const GENEL_BANKACILIK_TOPICS: [&str; 5] =
    ["BANKACILIK", "EKONOMİ", "MUHASEBE", "KREDİLER", "HUKUK"];
/// The single topic of the "Genel Kültür" section.
pub const GENEL_KULTUR_TOPIC: &str = "GENEL KÜLTÜR";
/// Topics of the "Genel Yetenek" section.
pub const GENEL_YETENEK_TOPICS: [&str; 4] = ["MATEMATİK", "TÜRKÇE", "TARİH", "COĞRAFYA"];

/// A question as stored by one of the question pools. Every field except `id` may be
/// missing or carry legacy values.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soru_metni: Option<String>,
    #[serde(default)]
    pub cevaplar: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dogru_cevap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aciklama: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soru_numarasi: Option<u32>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// A normalized exam question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub soru_metni: String,
    /// Answer options, lettered A, B, C... by position.
    #[serde(default)]
    pub cevaplar: Vec<String>,
    /// The text of the correct option, not its index.
    #[serde(default)]
    pub dogru_cevap: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub aciklama: Option<String>,
    /// Position within a built exam. `None` until numbers are assigned.
    #[serde(default)]
    pub soru_numarasi: Option<u32>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The pool a question was fetched from.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Manual,
    Konular,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// The fixed sections of a banking exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    GenelKultur,
    GenelYetenek,
    GenelBankacilik,
    Diger,
}

impl Source {
    /// Anything other than `manual` is treated as the topic hierarchy.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.trim().eq_ignore_ascii_case("manual") => Source::Manual,
            _ => Source::Konular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Konular => "konular",
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::Konular
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Source::parse(raw.as_deref()))
    }
}

impl Difficulty {
    /// Map a free-form difficulty, including the Turkish names and legacy placeholder
    /// values, onto one of the three canonical levels. Unknown values become `Easy`.
    pub fn normalize(raw: Option<&str>) -> Self {
        let raw = match raw {
            Some(raw) => fold(raw),
            None => return Difficulty::Easy,
        };
        match raw.as_str() {
            "easy" | "kolay" => Difficulty::Easy,
            "medium" | "orta" => Difficulty::Medium,
            "hard" | "zor" => Difficulty::Hard,
            "unspecified" | "belirsiz" | "" => Difficulty::Easy,
            _ => Difficulty::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Easy
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Stored exams may carry legacy values, so reading one goes through the same table.
impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Difficulty::normalize(raw.as_deref()))
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase().nfc().collect::<String>()
}

/// Read a creation time written as an RFC 3339 string, a `{seconds, nanoseconds}`
/// object, or epoch seconds. Anything else reads as `None`.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| parse_timestamp(&value)))
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Null => return None,
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::Object(map) => {
            let nanos = match timestamp_field(map, "nanoseconds") {
                Some(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                None => Some(0),
            };
            match (timestamp_field(map, "seconds").and_then(Value::as_i64), nanos) {
                (Some(secs), Some(nanos)) => Utc.timestamp_opt(secs, nanos).single(),
                _ => None,
            }
        }
        _ => None,
    };
    if parsed.is_none() {
        warn!(value = %value, "ignoring unreadable createdAt");
    }
    parsed
}

// Some exporters prefix the timestamp fields with an underscore.
fn timestamp_field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).or_else(|| map.get(&format!("_{}", name)))
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::GenelKultur => "Genel Kültür",
            Category::GenelYetenek => "Genel Yetenek",
            Category::GenelBankacilik => "Genel Bankacılık",
            Category::Diger => "Diğer",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Return the exam section a topic belongs to. The comparison is against the exact
/// uppercase Turkish topic names; variants in case or spacing fall into `Diger`.
pub fn categorize(topic_name: &str) -> Category {
    if GENEL_BANKACILIK_TOPICS.contains(&topic_name) {
        Category::GenelBankacilik
    } else if topic_name == GENEL_KULTUR_TOPIC {
        Category::GenelKultur
    } else if GENEL_YETENEK_TOPICS.contains(&topic_name) {
        Category::GenelYetenek
    } else {
        Category::Diger
    }
}

/// Normalize a sequence of raw records. Order is kept and nothing is deduplicated.
pub fn normalize(records: Vec<QuestionRecord>) -> Vec<Question> {
    records.into_iter().map(Question::from).collect()
}

impl From<QuestionRecord> for Question {
    fn from(record: QuestionRecord) -> Self {
        Question {
            difficulty: Difficulty::normalize(record.difficulty.as_deref()),
            source: Source::parse(record.source.as_deref()),
            id: record.id,
            topic_name: record.topic_name.unwrap_or_default(),
            topic_id: record.topic_id,
            soru_metni: record.soru_metni.unwrap_or_default(),
            cevaplar: record.cevaplar,
            dogru_cevap: record.dogru_cevap.unwrap_or_default(),
            aciklama: record.aciklama,
            soru_numarasi: record.soru_numarasi,
            created_at: record.created_at,
        }
    }
}

impl From<Question> for QuestionRecord {
    fn from(q: Question) -> Self {
        QuestionRecord {
            id: q.id,
            topic_name: Some(q.topic_name),
            topic_id: q.topic_id,
            source: Some(String::from(q.source.as_str())),
            soru_metni: Some(q.soru_metni),
            cevaplar: q.cevaplar,
            dogru_cevap: Some(q.dogru_cevap),
            difficulty: Some(String::from(q.difficulty.as_str())),
            aciklama: q.aciklama,
            soru_numarasi: q.soru_numarasi,
            created_at: q.created_at,
        }
    }
}

impl Question {
    pub fn new(id: &str, topic_name: &str) -> Self {
        Question::from(QuestionRecord {
            id: String::from(id),
            topic_name: Some(String::from(topic_name)),
            ..QuestionRecord::default()
        })
    }

    pub fn category(&self) -> Category {
        categorize(&self.topic_name)
    }

    pub fn has_text(&self) -> bool {
        !self.soru_metni.trim().is_empty()
    }

    /// A question can go into an exam only if it has a text and at least one option.
    pub fn is_usable(&self) -> bool {
        self.has_text() && !self.cevaplar.is_empty()
    }

    /// The question text with HTML entities decoded.
    pub fn display_text(&self) -> String {
        html_escape::decode_html_entities(&self.soru_metni).into_owned()
    }

    /// Letter of the first option whose text equals `dogru_cevap`.
    pub fn correct_option(&self) -> Option<char> {
        let answer = self.dogru_cevap.trim();
        self.cevaplar
            .iter()
            .position(|c| c.trim() == answer)
            .and_then(option_letter)
    }
}

/// Letter for the option at `index`: 0 is 'A', 1 is 'B' and so on.
pub fn option_letter(index: usize) -> Option<char> {
    if index < 26 {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}
