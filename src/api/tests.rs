use super::*;
use crate::config::ServerSettings;
use crate::library::TrackMetadata;
use crate::task::CancelToken;

use super::client::read_body;

fn page(ids: &[&str], next: Option<&str>) -> FilePage {
    FilePage {
        files: ids
            .iter()
            .map(|id| crate::library::FileEntry {
                id: id.to_string(),
                name: format!("{id}.mp3"),
                mime_type: Some("audio/mpeg".into()),
            })
            .collect(),
        next_page_token: next.map(str::to_string),
    }
}

#[test]
fn stream_url_encodes_the_file_id() {
    assert_eq!(
        stream_url("http://localhost:3000/", "a b&c"),
        "http://localhost:3000/api/stream?fileId=a%20b%26c"
    );
}

#[test]
fn collect_pages_follows_tokens_until_exhausted() {
    let mut seen_tokens: Vec<Option<String>> = Vec::new();
    let files = collect_pages(|token| {
        seen_tokens.push(token.map(str::to_string));
        Ok(match token {
            None => page(&["1", "2"], Some("p2")),
            Some("p2") => page(&["3"], Some("")),
            Some(other) => panic!("unexpected token {other}"),
        })
    })
    .unwrap();

    let ids: Vec<&str> = files.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
    assert_eq!(seen_tokens, vec![None, Some("p2".to_string())]);
}

#[test]
fn collect_pages_propagates_transport_failure() {
    let result = collect_pages(|token| match token {
        None => Ok(page(&["1"], Some("p2"))),
        Some(_) => Err(ApiError::Status {
            url: "http://x/api/files".into(),
            status: 500,
        }),
    });
    assert!(matches!(result, Err(ApiError::Status { status: 500, .. })));
}

#[test]
fn empty_identifiers_are_rejected_without_a_request() {
    let client = ApiClient::new(&ServerSettings {
        // Nothing listens here; the call must fail before connecting.
        base_url: "http://127.0.0.1:9".into(),
        ..ServerSettings::default()
    });
    assert!(matches!(
        client.metadata("  "),
        Err(ApiError::MissingParameter("fileId"))
    ));
    assert!(matches!(
        client.artist_info(""),
        Err(ApiError::MissingParameter("name"))
    ));
}

#[test]
fn listing_page_parses_camel_case_body() {
    let body = r#"{"files":[{"id":"f1","name":"one.flac","mimeType":"audio/flac"}],"nextPageToken":"t"}"#;
    let parsed: FilePage = serde_json::from_str(body).unwrap();
    assert_eq!(parsed.files[0].mime_type.as_deref(), Some("audio/flac"));
    assert_eq!(parsed.next_page_token.as_deref(), Some("t"));

    let last: FilePage = serde_json::from_str(r#"{"files":[]}"#).unwrap();
    assert!(last.next_page_token.is_none());
}

#[test]
fn metadata_body_accepts_string_years_and_nulls() {
    let body = r#"{
        "title": "Song",
        "artist": "Band",
        "album": null,
        "year": "2004",
        "genre": ["Rock"],
        "duration": 201.5,
        "bitrate": 320000,
        "albumArtUrl": null
    }"#;
    let meta: TrackMetadata = serde_json::from_str(body).unwrap();
    assert_eq!(meta.year, Some(2004));
    assert_eq!(meta.album, None);
    assert_eq!(meta.duration, Some(201.5));
    assert_eq!(meta.genre, Some(vec!["Rock".to_string()]));
}

#[test]
fn read_body_collects_the_whole_stream() {
    let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let cancel = CancelToken::new();
    let bytes = read_body(
        std::io::Cursor::new(data.clone()),
        "http://srv/api/stream?fileId=a",
        Some(data.len()),
        &cancel,
    )
    .unwrap();
    assert_eq!(bytes, data);
}

#[test]
fn read_body_stops_once_cancelled() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = read_body(
        std::io::Cursor::new(vec![1u8; 1024]),
        "http://srv/api/stream?fileId=a",
        None,
        &cancel,
    );
    assert!(matches!(result, Err(ApiError::Cancelled { .. })));
}

#[test]
fn fetch_stream_skips_the_request_when_already_cancelled() {
    let client = ApiClient::new(&ServerSettings {
        base_url: "http://127.0.0.1:9".into(),
        ..ServerSettings::default()
    });
    let cancel = CancelToken::new();
    cancel.cancel();
    let result = client.fetch_stream("http://127.0.0.1:9/api/stream?fileId=a", &cancel);
    assert!(matches!(result, Err(ApiError::Cancelled { .. })));
}
