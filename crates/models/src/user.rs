use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use suggest::NamedRecord;

use crate::{iso_timestamp, non_blank, ArtistRecord, ArtistType, EditError, Gender};

/// Body of a document in the `users` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub myplaylists: Vec<Playlist>,
    #[serde(default)]
    pub mysongs: Vec<LibrarySong>,
    /// Ids of followed artists.
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(rename = "playlistId", default)]
    pub playlist_id: String,
    #[serde(rename = "playlistName", default, skip_serializing_if = "Option::is_none")]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub songs: Vec<PlaylistSong>,
    #[serde(rename = "coverImgUrl", default, skip_serializing_if = "Option::is_none")]
    pub cover_img_url: Option<String>,
    #[serde(rename = "updatedOn", default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference from a playlist to a song, by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistSong {
    #[serde(rename = "songId", default)]
    pub song_id: String,
    #[serde(rename = "addedOn", default, skip_serializing_if = "Option::is_none")]
    pub added_on: Option<String>,
}

/// Element of [`User::mysongs`], the songs a playlist can be built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySong {
    #[serde(rename = "songId", default)]
    pub song_id: String,
    #[serde(rename = "songName", default, skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub singer: Option<String>,
    #[serde(rename = "coverImgUrl", default, skip_serializing_if = "Option::is_none")]
    pub cover_img_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields the playlist editor overwrites.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistEdit {
    pub playlist_name: String,
    #[serde(default)]
    pub song_ids: Vec<String>,
}

impl User {
    pub fn playlist(&self, playlist_id: &str) -> Option<&Playlist> {
        self.myplaylists
            .iter()
            .find(|playlist| playlist.playlist_id == playlist_id)
    }

    fn playlist_mut(&mut self, playlist_id: &str) -> Result<&mut Playlist, EditError> {
        self.myplaylists
            .iter_mut()
            .find(|playlist| playlist.playlist_id == playlist_id)
            .ok_or_else(|| EditError::PlaylistNotFound(playlist_id.to_string()))
    }

    /// Rename the playlist and replace its song list with `edit.song_ids`.
    ///
    /// Every song reference is re-stamped with `now`, duplicates are dropped
    /// keeping the first occurrence.
    pub fn update_playlist(
        &mut self,
        playlist_id: &str,
        edit: PlaylistEdit,
        now: DateTime<Utc>,
    ) -> Result<&Playlist, EditError> {
        let name = non_blank(&edit.playlist_name)
            .ok_or(EditError::MissingField("playlist_name"))?
            .to_string();
        let stamp = iso_timestamp(now);

        let playlist = self.playlist_mut(playlist_id)?;

        let mut seen = HashSet::new();
        playlist.songs = edit
            .song_ids
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .map(|song_id| PlaylistSong {
                song_id,
                added_on: Some(stamp.clone()),
            })
            .collect();
        playlist.playlist_name = Some(name);
        playlist.updated_on = Some(stamp);
        Ok(&*playlist)
    }

    /// Point the playlist at a new cover, returning the URL it replaced.
    pub fn set_playlist_cover(
        &mut self,
        playlist_id: &str,
        cover_img_url: String,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, EditError> {
        let playlist = self.playlist_mut(playlist_id)?;
        let previous = playlist
            .cover_img_url
            .replace(cover_img_url)
            .filter(|url| !url.is_empty());
        playlist.updated_on = Some(iso_timestamp(now));
        Ok(previous)
    }

    pub fn remove_playlist(&mut self, playlist_id: &str) -> Result<Playlist, EditError> {
        let idx = self
            .myplaylists
            .iter()
            .position(|playlist| playlist.playlist_id == playlist_id)
            .ok_or_else(|| EditError::PlaylistNotFound(playlist_id.to_string()))?;
        Ok(self.myplaylists.remove(idx))
    }

    pub fn follows(&self, artist_id: &str) -> bool {
        self.artists.iter().any(|id| id == artist_id)
    }

    /// Library songs for the playlist picker: ranked song-name matches first, then
    /// songs whose singer matches and whose name did not.
    pub fn suggest_library_songs(&self, query: &str) -> Vec<&LibrarySong> {
        let mut ranked = suggest::rank(&self.mysongs, query);
        let by_name: HashSet<&str> = ranked.iter().map(|song| song.song_id.as_str()).collect();

        let by_singer = suggest::rank_by(&self.mysongs, query, |song| song.singer.as_deref());
        ranked.extend(
            by_singer
                .into_iter()
                .filter(|song| !by_name.contains(song.song_id.as_str())),
        );
        ranked
    }

    /// Artists of the given type and gender this user does not follow yet, in input order.
    pub fn recommended_artists<'a>(
        &self,
        all: &'a [ArtistRecord],
        artist_type: ArtistType,
        gender: Gender,
    ) -> Vec<&'a ArtistRecord> {
        let followed: HashSet<&str> = self.artists.iter().map(String::as_str).collect();

        all.iter()
            .filter(|record| !followed.contains(record.id.as_str()))
            .filter(|record| record.artist.artist_type == Some(artist_type))
            .filter(|record| record.artist.gender == Some(gender))
            .collect()
    }
}

impl NamedRecord for LibrarySong {
    fn record_id(&self) -> &str {
        &self.song_id
    }

    fn display_name(&self) -> Option<&str> {
        self.song_name.as_deref()
    }
}
