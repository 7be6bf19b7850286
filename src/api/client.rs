use std::io::Read;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ServerSettings;
use crate::library::{ArtistInfo, FileEntry, TrackMetadata};
use crate::task::CancelToken;

use super::error::ApiError;

/// Upper bound on listing pages, in case a server keeps handing out tokens.
const MAX_LISTING_PAGES: usize = 1_000;
/// Upper bound on a single buffered audio stream.
const MAX_STREAM_BYTES: u64 = 1024 * 1024 * 1024;
const STREAM_CHUNK: usize = 64 * 1024;

/// Storage listing and per-file metadata.
pub trait LibrarySource: Send + Sync {
    /// Every audio file in the library folder, following pagination.
    fn list_files(&self) -> Result<Vec<FileEntry>, ApiError>;
    /// Parsed (and enriched) tags for one file.
    fn metadata(&self, file_id: &str) -> Result<TrackMetadata, ApiError>;
}

/// Artist enrichment. `Ok(None)` means the artist is unknown.
pub trait ArtistSource: Send + Sync {
    fn artist_info(&self, name: &str) -> Result<Option<ArtistInfo>, ApiError>;
}

/// Raw audio bytes for playback. Downloads stop early once `cancel` fires.
pub trait StreamSource: Send + Sync {
    fn fetch_stream(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, ApiError>;
}

/// One page of the storage listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilePage {
    pub files: Vec<FileEntry>,
    pub next_page_token: Option<String>,
}

/// Follow continuation tokens until the listing is exhausted.
pub fn collect_pages<F>(mut fetch_page: F) -> Result<Vec<FileEntry>, ApiError>
where
    F: FnMut(Option<&str>) -> Result<FilePage, ApiError>,
{
    let mut files: Vec<FileEntry> = Vec::new();
    let mut token: Option<String> = None;

    for page_no in 0..MAX_LISTING_PAGES {
        let page = fetch_page(token.as_deref())?;
        debug!(page = page_no, count = page.files.len(), "fetched listing page");
        files.extend(page.files);

        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(next) => token = Some(next),
            None => return Ok(files),
        }
    }

    warn!(
        pages = MAX_LISTING_PAGES,
        "listing still paginating after page cap, keeping what was fetched"
    );
    Ok(files)
}

/// Streaming endpoint for one file.
pub fn stream_url(base_url: &str, file_id: &str) -> String {
    format!(
        "{}/api/stream?fileId={}",
        base_url.trim().trim_end_matches('/'),
        urlencoding::encode(file_id)
    )
}

/// Blocking client for the library server, backed by `ureq`.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    agent: ureq::Agent,
}

impl ApiClient {
    pub fn new(settings: &ServerSettings) -> Self {
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout.min(Duration::from_secs(5)))
            .timeout_read(timeout)
            .timeout_write(timeout)
            .user_agent(&settings.user_agent)
            .build();
        Self {
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(|e| ApiError::from_ureq(&url, e))?;
        response
            .into_json::<T>()
            .map_err(|source| ApiError::Decode { url, source })
    }
}

impl StreamSource for ApiClient {
    /// Download a whole audio stream into memory.
    fn fetch_stream(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled {
                url: url.to_string(),
            });
        }
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ApiError::from_ureq(url, e))?;

        let size_hint = response
            .header("Content-Length")
            .and_then(|v| v.parse::<usize>().ok());
        let bytes = read_body(response.into_reader(), url, size_hint, cancel)?;
        debug!(url, bytes = bytes.len(), "stream downloaded");
        Ok(bytes)
    }
}

/// Read a response body in chunks, giving up as soon as `cancel` fires.
/// Bodies beyond `MAX_STREAM_BYTES` are truncated.
pub(crate) fn read_body(
    reader: impl Read,
    url: &str,
    size_hint: Option<usize>,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ApiError> {
    let mut reader = reader.take(MAX_STREAM_BYTES);
    let mut bytes: Vec<u8> = match size_hint {
        Some(len) => Vec::with_capacity(len.min(MAX_STREAM_BYTES as usize)),
        None => Vec::new(),
    };
    let mut chunk = vec![0u8; STREAM_CHUNK];

    loop {
        if cancel.is_cancelled() {
            debug!(url, read = bytes.len(), "stream download cancelled");
            return Err(ApiError::Cancelled {
                url: url.to_string(),
            });
        }
        match reader.read(&mut chunk) {
            Ok(0) => return Ok(bytes),
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ApiError::Decode {
                    url: url.to_string(),
                    source,
                });
            }
        }
    }
}

impl LibrarySource for ApiClient {
    fn list_files(&self) -> Result<Vec<FileEntry>, ApiError> {
        collect_pages(|token| match token {
            Some(t) => self.get_json("/api/files", &[("pageToken", t)]),
            None => self.get_json("/api/files", &[]),
        })
    }

    fn metadata(&self, file_id: &str) -> Result<TrackMetadata, ApiError> {
        if file_id.trim().is_empty() {
            return Err(ApiError::MissingParameter("fileId"));
        }
        self.get_json("/api/metadata", &[("fileId", file_id)])
    }
}

impl ArtistSource for ApiClient {
    fn artist_info(&self, name: &str) -> Result<Option<ArtistInfo>, ApiError> {
        if name.trim().is_empty() {
            return Err(ApiError::MissingParameter("name"));
        }
        match self.get_json::<ArtistInfo>("/api/artist-info", &[("name", name)]) {
            Ok(mut info) => {
                if info.name.trim().is_empty() {
                    info.name = name.to_string();
                }
                Ok(Some(info))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
