use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

pub mod artist;
pub mod config;
pub mod user;

pub use artist::{Artist, ArtistDetails, ArtistRecord, ArtistSong, SongEdit};
pub use user::{LibrarySong, Playlist, PlaylistEdit, PlaylistSong, User};

/// Catalog collection names as stored in the document store.
pub const ARTISTS_COLLECTION: &str = "artists";
pub const USERS_COLLECTION: &str = "users";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[strum(ascii_case_insensitive)]
pub enum ArtistType {
    #[serde(rename = "indian")]
    #[strum(serialize = "indian")]
    Indian,
    #[serde(rename = "foreigner")]
    #[strum(serialize = "foreigner")]
    Foreigner,
}

impl ArtistType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indian => "indian",
            Self::Foreigner => "foreigner",
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    #[serde(rename = "male")]
    #[strum(serialize = "male")]
    Male,
    #[serde(rename = "female")]
    #[strum(serialize = "female")]
    Female,
}

impl Gender {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Failure of an in-memory document edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    SongNotFound(String),
    PlaylistNotFound(String),
    MissingField(&'static str),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SongNotFound(id) => write!(f, "song not found: {id}"),
            Self::PlaylistNotFound(id) => write!(f, "playlist not found: {id}"),
            Self::MissingField(field) => write!(f, "missing required field: {field}"),
        }
    }
}

impl std::error::Error for EditError {}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T10:20:30.123Z`.
pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode an optional enum field, treating blanks and unknown values as absent.
/// Unselected form options are stored as `""`.
pub(crate) fn lenient_enum<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| T::from_str(value.trim()).ok()))
}

pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
