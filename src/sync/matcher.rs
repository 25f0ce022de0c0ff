//! Track identity matching.
//!
//! The player's uri is authoritative when both sides carry one. Otherwise, or
//! when the uris disagree, titles and artists are compared after normalization
//! with a mutual-substring rule that tolerates remaster tags, live annotations
//! and featuring-artist suffixes.

use crate::player::TrackIdentity;
use crate::request_store::SongRequest;

/// Lower-case, collapse every run of non-alphanumeric characters to a single
/// space, trim.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for c in s.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

fn mutually_contains(a: &str, b: &str) -> bool {
    a.contains(b) || b.contains(a)
}

/// Title rule on already-normalized strings. A track without a name can only
/// be matched by uri.
fn titles_match(request_title: &str, track_name: &str) -> bool {
    !track_name.is_empty() && mutually_contains(request_title, track_name)
}

/// Artist rule on already-normalized strings. A missing artist on either side
/// is not held against the match.
fn artists_match(a: &str, b: &str) -> bool {
    a.is_empty() || b.is_empty() || mutually_contains(a, b)
}

/// Fuzzy comparison of a request's text against a track's text.
pub fn matches_by_text(request: &SongRequest, identity: &TrackIdentity) -> bool {
    titles_match(&normalize(&request.title), &normalize(&identity.name))
        && artists_match(
            &normalize(&request.artist),
            &normalize(&identity.artist_label()),
        )
}

/// Whether `request` asks for the track described by `identity`.
pub fn matches(request: &SongRequest, identity: &TrackIdentity) -> bool {
    if !request.track_uri.is_empty()
        && !identity.uri.is_empty()
        && request.track_uri == identity.uri
    {
        return true;
    }
    matches_by_text(request, identity)
}

/// Whether two observations describe the same sounding track. Any difference in
/// uri or in normalized name counts as a track change.
pub fn same_track(a: &TrackIdentity, b: &TrackIdentity) -> bool {
    a.uri == b.uri && normalize(&a.name) == normalize(&b.name)
}
