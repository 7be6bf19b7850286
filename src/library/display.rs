use crate::config::TrackDisplayField;

use super::model::Track;

/// Build a display string for a track according to the provided `fields` and separator.
///
/// Fields without a value are skipped; when nothing was produced the track's
/// display title is used.
pub fn display_from_fields(track: &Track, fields: &[TrackDisplayField], sep: &str) -> String {
    let mut parts: Vec<String> = Vec::new();

    let artist = track.artist.as_deref().map(str::trim).filter(|s| !s.is_empty());

    for f in fields {
        match f {
            TrackDisplayField::Display => {
                // "display" is the list label: "artist - title".
                if let Some(a) = artist {
                    parts.push(a.to_string());
                }
                parts.push(track.display_title().trim().to_string());
            }
            TrackDisplayField::Title => {
                let title = track.display_title().trim();
                if !title.is_empty() {
                    parts.push(title.to_string());
                }
            }
            TrackDisplayField::Artist => {
                if let Some(a) = artist {
                    parts.push(a.to_string());
                }
            }
            TrackDisplayField::Album => {
                if let Some(a) = track
                    .album
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                {
                    parts.push(a.to_string());
                }
            }
            TrackDisplayField::Year => {
                if let Some(y) = track.year {
                    parts.push(y.to_string());
                }
            }
            TrackDisplayField::Genre => {
                if let Some(g) = track.genre.as_ref().filter(|g| !g.is_empty()) {
                    parts.push(g.join(", "));
                }
            }
        }
    }

    parts.retain(|p| !p.is_empty());
    if parts.is_empty() {
        track.display_title().to_string()
    } else {
        parts.join(sep)
    }
}
