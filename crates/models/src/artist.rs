use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use suggest::NamedRecord;

use crate::{iso_timestamp, lenient_enum, non_blank, ArtistType, EditError, Gender};

/// Body of a document in the `artists` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "artistId", default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(
        rename = "artistType",
        default,
        deserialize_with = "lenient_enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub artist_type: Option<ArtistType>,
    #[serde(
        default,
        deserialize_with = "lenient_enum",
        skip_serializing_if = "Option::is_none"
    )]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub songs: Vec<ArtistSong>,
    #[serde(rename = "updatedOn", default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Element of [`Artist::songs`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtistSong {
    #[serde(rename = "songId", default)]
    pub song_id: String,
    #[serde(rename = "songName", default, skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
    #[serde(rename = "coverImgUrl", default, skip_serializing_if = "Option::is_none")]
    pub cover_img_url: Option<String>,
    #[serde(rename = "songUrl", default, skip_serializing_if = "Option::is_none")]
    pub song_url: Option<String>,
    #[serde(rename = "updatedOn", default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An artist together with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    #[serde(flatten)]
    pub artist: Artist,
}

/// Fields the artist editor overwrites.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistDetails {
    pub name: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub artist_type: Option<ArtistType>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

/// Fields the song editor overwrites on one embedded song.
#[derive(Debug, Clone, Deserialize)]
pub struct SongEdit {
    pub song_name: String,
    #[serde(default)]
    pub cover_img_url: Option<String>,
    #[serde(default)]
    pub song_url: Option<String>,
}

impl Artist {
    pub fn apply_details(
        &mut self,
        details: ArtistDetails,
        now: DateTime<Utc>,
    ) -> Result<(), EditError> {
        let name = non_blank(&details.name).ok_or(EditError::MissingField("name"))?;

        self.name = Some(name.to_string());
        self.photo_url = details.photo_url;
        self.artist_type = details.artist_type;
        self.gender = details.gender;
        self.updated_on = Some(iso_timestamp(now));
        Ok(())
    }

    pub fn song(&self, song_id: &str) -> Option<&ArtistSong> {
        self.songs.iter().find(|song| song.song_id == song_id)
    }

    /// Rewrite the song with `song_id` in place; every other element is left as-is.
    pub fn update_song(
        &mut self,
        song_id: &str,
        edit: SongEdit,
        now: DateTime<Utc>,
    ) -> Result<&ArtistSong, EditError> {
        let name = non_blank(&edit.song_name)
            .ok_or(EditError::MissingField("song_name"))?
            .to_string();

        let song = self
            .songs
            .iter_mut()
            .find(|song| song.song_id == song_id)
            .ok_or_else(|| EditError::SongNotFound(song_id.to_string()))?;

        song.song_name = Some(name);
        song.cover_img_url = edit.cover_img_url;
        song.song_url = edit.song_url;
        song.updated_on = Some(iso_timestamp(now));
        Ok(&*song)
    }
}

impl NamedRecord for ArtistRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> Option<&str> {
        self.artist.name.as_deref()
    }
}

impl NamedRecord for ArtistSong {
    fn record_id(&self) -> &str {
        &self.song_id
    }

    fn display_name(&self) -> Option<&str> {
        self.song_name.as_deref()
    }
}
