use serde::{Deserialize, Serialize};
use suggest::NamedRecord;

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

/// One row of a suggestion list.
#[derive(Debug, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
}

impl Suggestion {
    pub fn from_record<T: NamedRecord>(record: &T) -> Self {
        Self {
            id: record.record_id().to_string(),
            name: record.display_name().unwrap_or_default().to_string(),
        }
    }
}

pub fn suggestions<T: NamedRecord>(ranked: Vec<&T>) -> Vec<Suggestion> {
    ranked.into_iter().map(Suggestion::from_record).collect()
}

/// A document (or a piece of one) with the version to send back on the next write.
#[derive(Debug, Serialize)]
pub struct VersionedResponse<T> {
    pub id: String,
    pub version: i64,
    pub data: T,
}
