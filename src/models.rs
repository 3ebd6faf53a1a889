//! Data models for the admin overlay.
//!
//! Entries are owned by the backend; everything here is either a wire
//! shape exchanged with the admin API or a value derived from one.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Entry Identity
// ============================================================================

/// Opaque, stable identifier of an entry.
///
/// The backend emits integers, pages carry strings; both collapse to the
/// same textual form so ids resolved from the DOM compare equal to ids
/// returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use as a single path segment.
    pub fn path_segment(&self) -> String {
        urlencoding::encode(&self.0).into_owned()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for EntryId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => EntryId(n.to_string()),
            RawId::Text(s) => EntryId(s),
        })
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Expression,
    Word,
    Phrase,
    Saying,
    Slang,
    Insult,
    TongueTwister,
    Idiom,
    #[default]
    #[serde(other)]
    Other,
}

impl Category {
    /// Every category, in the order the edit form lists them.
    pub const ALL: [Category; 9] = [
        Category::Expression,
        Category::Word,
        Category::Phrase,
        Category::Saying,
        Category::Slang,
        Category::Insult,
        Category::TongueTwister,
        Category::Idiom,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Expression => "expression",
            Category::Word => "word",
            Category::Phrase => "phrase",
            Category::Saying => "saying",
            Category::Slang => "slang",
            Category::Insult => "insult",
            Category::TongueTwister => "tongue-twister",
            Category::Idiom => "idiom",
            Category::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Expression => "Expression",
            Category::Word => "Word",
            Category::Phrase => "Phrase",
            Category::Saying => "Saying",
            Category::Slang => "Slang",
            Category::Insult => "Insult",
            Category::TongueTwister => "Tongue Twister",
            Category::Idiom => "Idiom",
            Category::Other => "Other",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

// ============================================================================
// Entries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub term: String,
    #[serde(default, deserialize_with = "category_or_other")]
    pub category: Category,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Uncategorized entries come back as `null`.
fn category_or_other<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Category, D::Error> {
    Ok(Option::<Category>::deserialize(deserializer)?.unwrap_or_default())
}

impl Entry {
    /// Tag names joined the way the edit form displays them.
    pub fn tags_text(&self) -> String {
        self.tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ============================================================================
// Response Envelope
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// Uniform `{status, message, entry?}` body returned by every admin
/// endpoint except the boundary check.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: Status,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub entry: Option<Entry>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// Result of the boundary call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdminIdentity {
    pub is_admin: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub username: Option<String>,
}

// ============================================================================
// Request Payloads
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryUpdate {
    pub term: String,
    pub category: Category,
    pub notes: String,
    /// Always sent; an empty string clears the stored value.
    pub part_of_speech: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagRequest {
    pub flag_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRequest {
    pub translation: String,
    pub target_language_code: String,
    pub literal_translation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleRequest {
    pub sentence: String,
    pub language_code: String,
    pub translation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    FlagEnglishInSpanish,
    MarkReviewed,
    RemoveTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkActionRequest {
    pub entry_ids: Vec<EntryId>,
    pub action: BulkAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
}

/// Split comma-separated tag text the way the edit form submits it.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_id_accepts_integer_and_string() {
        let a: EntryId = serde_json::from_value(json!(7)).unwrap();
        let b: EntryId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(&a).unwrap(), json!("7"));
    }

    #[test]
    fn entry_id_path_segment_is_encoded() {
        assert_eq!(EntryId::new("a b/c").path_segment(), "a%20b%2Fc");
    }

    #[test]
    fn category_wire_names() {
        let c: Category = serde_json::from_value(json!("tongue-twister")).unwrap();
        assert_eq!(c, Category::TongueTwister);
        let unknown: Category = serde_json::from_value(json!("terms_of_endearment")).unwrap();
        assert_eq!(unknown, Category::Other);
        assert_eq!("idiom".parse::<Category>().unwrap(), Category::Idiom);
        assert!("idioms".parse::<Category>().is_err());
    }

    #[test]
    fn envelope_ignores_extra_entry_fields() {
        let env: Envelope = serde_json::from_value(json!({
            "status": "success",
            "entry": {
                "id": 7,
                "term": "dale",
                "category": "word",
                "tags": [{"id": 3, "name": "slang"}],
                "translations": [],
                "created_at": "2024-01-01T00:00:00"
            }
        }))
        .unwrap();
        assert!(env.is_success());
        assert_eq!(env.message, "");
        let entry = env.entry.unwrap();
        assert_eq!(entry.id, EntryId::from(7));
        assert_eq!(entry.tags_text(), "slang");
        assert_eq!(entry.notes, None);
    }

    #[test]
    fn unknown_status_is_not_success() {
        let env: Envelope = serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert_eq!(env.status, Status::Unknown);
        assert!(!env.is_success());
    }

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(split_tags(" slang, ,insult ,, "), vec!["slang", "insult"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn update_sends_empty_part_of_speech() {
        let update = EntryUpdate {
            term: "dale".into(),
            category: Category::Word,
            notes: String::new(),
            part_of_speech: String::new(),
            tags: vec!["slang".into()],
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({
                "term": "dale",
                "category": "word",
                "notes": "",
                "part_of_speech": "",
                "tags": ["slang"]
            })
        );
    }

    #[test]
    fn uncategorized_entry_decodes_as_other() {
        let env: Envelope = serde_json::from_value(json!({
            "status": "success",
            "entry": {
                "id": 7,
                "term": "dale",
                "category": null,
                "part_of_speech": null,
                "notes": null,
                "tags": [{"id": 1, "name": "slang"}]
            }
        }))
        .unwrap();
        let entry = env.entry.unwrap();
        assert_eq!(entry.category, Category::Other);
        assert_eq!(entry.part_of_speech, None);
        assert_eq!(entry.tags_text(), "slang");

        let missing: Entry = serde_json::from_value(json!({"id": 8, "term": "che"})).unwrap();
        assert_eq!(missing.category, Category::Other);
    }

    #[test]
    fn bulk_action_wire_format() {
        let req = BulkActionRequest {
            entry_ids: vec![EntryId::from(1), EntryId::from(2)],
            action: BulkAction::FlagEnglishInSpanish,
            tag_name: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"entry_ids": ["1", "2"], "action": "flag_english_in_spanish"})
        );
    }
}
