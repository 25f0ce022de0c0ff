//! Database schema for the song request store.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Song requests, one row per customer ask.
const SONG_REQUESTS_TABLE_V0: Table = Table {
    name: "song_requests",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("track_uri", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        // Milliseconds since the epoch
        sqlite_column!("created_at", &SqlType::Integer, non_null = true),
        sqlite_column!("updated_at", &SqlType::Integer),
        sqlite_column!("image_url", &SqlType::Text),
        sqlite_column!(
            "votes",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
    ],
    indices: &[
        ("idx_song_requests_status_created", "status, created_at"),
        ("idx_song_requests_track_uri", "track_uri"),
    ],
};

pub const REQUEST_STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[SONG_REQUESTS_TABLE_V0],
    migration: None,
}];
