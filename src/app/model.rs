//! Application model types: `App`, `View` and `Row`.
//!
//! The `App` struct owns the `PlayerStore` and the browse state (current
//! view, navigation history, selection and filter) used by the UI and
//! runtime. Views are derived from the catalog on demand.

use tracing::debug;

use crate::config::{TrackDisplayField, UiSettings};
use crate::library::{
    self, Track, album_info, album_tracks, artist_albums, display_from_fields, featured_albums,
    group_by_album, group_by_artist, recently_added,
};
use crate::store::PlayerStore;

/// Browse screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home,
    Albums,
    Album(String),
    Artists,
    Artist(String),
    Queue,
}

impl View {
    pub fn title(&self) -> String {
        match self {
            Self::Home => "home".to_string(),
            Self::Albums => "albums".to_string(),
            Self::Album(name) => format!("album: {name}"),
            Self::Artists => "artists".to_string(),
            Self::Artist(name) => format!("artist: {name}"),
            Self::Queue => "queue".to_string(),
        }
    }

    /// Which header tab this view belongs to.
    pub fn tab(&self) -> usize {
        match self {
            Self::Home => 0,
            Self::Albums | Self::Album(_) => 1,
            Self::Artists | Self::Artist(_) => 2,
            Self::Queue => 3,
        }
    }
}

pub const TABS: [&str; 4] = ["1 home", "2 albums", "3 artists", "4 queue"];

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Heading,
    /// A track at `position` within the view's track list.
    Track { track: Track, position: usize },
    Album(String),
    Artist(String),
    /// A queue entry at `index`.
    QueueEntry { track: Track, index: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    pub label: String,
}

impl Row {
    fn heading(label: impl Into<String>) -> Self {
        Self {
            kind: RowKind::Heading,
            label: label.into(),
        }
    }

    pub fn is_selectable(&self) -> bool {
        !matches!(self.kind, RowKind::Heading)
    }

    pub fn track(&self) -> Option<&Track> {
        match &self.kind {
            RowKind::Track { track, .. } | RowKind::QueueEntry { track, .. } => Some(track),
            _ => None,
        }
    }
}

/// The main application model.
pub struct App {
    pub store: PlayerStore,
    pub view: View,
    history: Vec<View>,
    /// Index into `visible_rows()`.
    pub selected: usize,

    pub filter_mode: bool,
    pub filter_query: String,
    pub metadata_window: bool,
    /// Last user-facing notice (errors, refresh results).
    pub message: Option<String>,

    list_fields: Vec<TrackDisplayField>,
    list_separator: String,
    recent_limit: usize,
    featured_limit: usize,
}

impl App {
    /// Create a new `App` around `store`, starting on the home view.
    pub fn new(store: PlayerStore, ui: &UiSettings) -> Self {
        let mut app = Self {
            store,
            view: View::Home,
            history: Vec::new(),
            selected: 0,
            filter_mode: false,
            filter_query: String::new(),
            metadata_window: false,
            message: None,
            list_fields: ui.list_track_fields.clone(),
            list_separator: ui.list_track_separator.clone(),
            recent_limit: ui.recent_limit,
            featured_limit: ui.featured_limit,
        };
        app.ensure_selected_visible();
        app
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    fn track_row(&self, track: &Track, position: usize) -> Row {
        Row {
            label: display_from_fields(track, &self.list_fields, &self.list_separator),
            kind: RowKind::Track {
                track: track.clone(),
                position,
            },
        }
    }

    fn album_row(group: &library::TrackGroup) -> Row {
        let mut label = group.name.clone();
        if let Some(artist) = group.lead_artist() {
            label.push_str(&format!(" - {artist}"));
        }
        if let Some(year) = group.year() {
            label.push_str(&format!(" ({year})"));
        }
        label.push_str(&format!("  [{}]", group.tracks.len()));
        Row {
            kind: RowKind::Album(group.name.clone()),
            label,
        }
    }

    /// Every row of the current view, before filtering.
    pub fn rows(&self) -> Vec<Row> {
        let tracks = self.store.catalog().tracks();
        let mut rows: Vec<Row> = Vec::new();

        match &self.view {
            View::Home => {
                rows.push(Row::heading("Recently added"));
                for (i, t) in recently_added(tracks, self.recent_limit).iter().enumerate() {
                    rows.push(self.track_row(t, i));
                }
                rows.push(Row::heading("Featured albums"));
                for group in featured_albums(tracks, self.featured_limit) {
                    rows.push(Self::album_row(&group));
                }
            }
            View::Albums => {
                for group in group_by_album(tracks) {
                    rows.push(Self::album_row(&group));
                }
            }
            View::Album(name) => {
                let own = album_tracks(tracks, name);
                rows.push(Row::heading(self.album_heading(name, own.len())));
                for (i, t) in own.iter().enumerate() {
                    rows.push(self.track_row(t, i));
                }
            }
            View::Artists => {
                for group in group_by_artist(tracks) {
                    let label = format!("{}  [{}]", group.name, group.tracks.len());
                    rows.push(Row {
                        kind: RowKind::Artist(group.name),
                        label,
                    });
                }
            }
            View::Artist(name) => {
                let mut position = 0;
                for group in artist_albums(tracks, name) {
                    rows.push(Row::heading(group.name.clone()));
                    for t in &group.tracks {
                        rows.push(self.track_row(t, position));
                        position += 1;
                    }
                }
                let loose: Vec<&Track> = tracks
                    .iter()
                    .filter(|t| t.artist.as_deref() == Some(name.as_str()) && t.album.is_none())
                    .collect();
                if !loose.is_empty() {
                    rows.push(Row::heading("Other tracks"));
                    for t in loose {
                        rows.push(self.track_row(t, position));
                        position += 1;
                    }
                }
            }
            View::Queue => {
                let current = self.store.current_track().map(|t| t.id.as_str());
                for (index, t) in self.store.queue().iter().enumerate() {
                    let marker = if Some(t.id.as_str()) == current { "* " } else { "  " };
                    let label = format!(
                        "{marker}{}",
                        display_from_fields(t, &self.list_fields, &self.list_separator)
                    );
                    rows.push(Row {
                        kind: RowKind::QueueEntry {
                            track: t.clone(),
                            index,
                        },
                        label,
                    });
                }
            }
        }
        rows
    }

    fn album_heading(&self, name: &str, count: usize) -> String {
        match self.store.cache().album(name) {
            Some(info) => {
                let mut heading = name.to_string();
                if let Some(artist) = &info.artist {
                    heading.push_str(&format!(" - {artist}"));
                }
                if let Some(year) = info.year {
                    heading.push_str(&format!(" ({year})"));
                }
                if !info.genres.is_empty() {
                    heading.push_str(&format!(" | {}", info.genres.join(", ")));
                }
                heading.push_str(&format!("  [{count}]"));
                heading
            }
            None => format!("{name}  [{count}]"),
        }
    }

    /// Rows after applying the fuzzy filter. Headings drop out while filtering.
    pub fn visible_rows(&self) -> Vec<Row> {
        let query = self.filter_query.trim();
        let rows = self.rows();
        if query.is_empty() {
            return rows;
        }
        rows.into_iter()
            .filter(|r| r.is_selectable() && Self::fuzzy_match_positions(&r.label, query).is_some())
            .collect()
    }

    pub fn selected_row(&self) -> Option<Row> {
        self.visible_rows().into_iter().nth(self.selected)
    }

    /// Tracks of the view the selected row belongs to, for album playback.
    fn view_tracks(&self) -> Vec<Track> {
        match &self.view {
            View::Album(name) => album_tracks(self.store.catalog().tracks(), name),
            _ => Vec::new(),
        }
    }

    fn tracks_for_row(&self, row: &Row) -> Vec<Track> {
        let tracks = self.store.catalog().tracks();
        match &row.kind {
            RowKind::Heading => Vec::new(),
            RowKind::Track { track, .. } | RowKind::QueueEntry { track, .. } => {
                vec![track.clone()]
            }
            RowKind::Album(name) => album_tracks(tracks, name),
            RowKind::Artist(name) => tracks
                .iter()
                .filter(|t| t.artist.as_deref() == Some(name.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Enter on the selected row.
    pub fn activate(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        match row.kind {
            RowKind::Heading => {}
            RowKind::Album(name) => self.open(View::Album(name)),
            RowKind::Artist(name) => self.open(View::Artist(name)),
            RowKind::QueueEntry { track, .. } => {
                self.store.set_current_track(Some(track));
                self.store.set_is_playing(true);
            }
            RowKind::Track { track, position } => match &self.view {
                View::Album(_) => {
                    let is_current =
                        self.store.current_track().map(|t| t.id.as_str()) == Some(track.id.as_str());
                    if is_current {
                        let playing = self.store.is_playing();
                        self.store.set_is_playing(!playing);
                    } else {
                        let album = self.view_tracks();
                        self.store.play_album(album, Some(position));
                    }
                }
                _ => self.store.play_track(track),
            },
        }
    }

    /// Queue the selected track, or every track behind an album/artist row.
    pub fn add_selected_to_queue(&mut self) -> usize {
        let Some(row) = self.selected_row() else {
            return 0;
        };
        if matches!(row.kind, RowKind::QueueEntry { .. }) {
            return 0;
        }
        let tracks = self.tracks_for_row(&row);
        let added = tracks.len();
        self.store.add_to_queue(tracks);
        if added > 0 {
            self.set_message(format!("queued {added} track(s)"));
        }
        added
    }

    /// Play the selected album from its first track.
    pub fn play_selected_album(&mut self) {
        let tracks = match (&self.view, self.selected_row().map(|r| r.kind)) {
            (_, Some(RowKind::Album(name))) => album_tracks(self.store.catalog().tracks(), &name),
            (View::Album(_), _) => self.view_tracks(),
            _ => return,
        };
        self.store.play_album(tracks, None);
    }

    /// Remove the selected queue entry (every entry with that id).
    pub fn remove_selected_from_queue(&mut self) {
        if let Some(RowKind::QueueEntry { track, .. }) = self.selected_row().map(|r| r.kind) {
            self.store.remove_from_queue(&track.id);
            self.ensure_selected_visible();
        }
    }

    pub fn clear_queue(&mut self) {
        self.store.clear_queue();
        self.ensure_selected_visible();
    }

    /// Jump to a top-level view, dropping navigation history.
    pub fn switch_to(&mut self, view: View) {
        self.history.clear();
        self.show(view);
    }

    /// Open a detail view, remembering where we came from.
    pub fn open(&mut self, view: View) {
        let previous = std::mem::replace(&mut self.view, View::Home);
        self.history.push(previous);
        self.show(view);
    }

    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(view) => {
                self.show(view);
                true
            }
            None => false,
        }
    }

    fn show(&mut self, view: View) {
        debug!(view = %view.title(), "switching view");
        self.view = view;
        self.filter_query.clear();
        self.filter_mode = false;
        self.selected = 0;
        self.metadata_window = false;
        self.ensure_album_info();
        self.ensure_selected_visible();
    }

    /// Album detail views keep a derived summary in the lookup cache.
    fn ensure_album_info(&mut self) {
        let View::Album(name) = &self.view else {
            return;
        };
        if self.store.cache().contains_album(name) {
            return;
        }
        let info = album_info(name, self.store.catalog().tracks());
        if info.track_count > 0 {
            let name = name.clone();
            self.store.cache_mut().set_album(&name, info);
        }
    }

    /// Artist whose bio the current view wants.
    pub fn wanted_artist(&self) -> Option<&str> {
        match &self.view {
            View::Artist(name) => Some(name),
            _ => None,
        }
    }

    /// Called after the catalog was replaced. Derived album summaries are
    /// rebuilt from the new tags; albums that vanished are dropped.
    pub fn library_changed(&mut self) {
        let names: Vec<String> = self.store.cache().albums().keys().cloned().collect();
        for name in names {
            let info = album_info(&name, self.store.catalog().tracks());
            if info.track_count > 0 {
                if self.store.cache().album(&name) != Some(&info) {
                    self.store.cache_mut().set_album(&name, info);
                }
            } else {
                self.store.cache_mut().remove_album(&name);
            }
        }
        self.ensure_album_info();
        self.ensure_selected_visible();
    }

    // Fuzzy/subsequence match: return the character positions (by char index)
    // in `title` that match the query, or None if not matched.
    pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
        if query.is_empty() {
            return Some(Vec::new());
        }

        let mut positions: Vec<usize> = Vec::new();
        let mut title_iter = title.chars().enumerate();

        for qc in query.chars() {
            let qc_low = qc.to_ascii_lowercase();
            loop {
                match title_iter.next() {
                    Some((ti, tc)) if tc.to_ascii_lowercase() == qc_low => {
                        positions.push(ti);
                        break;
                    }
                    Some(_) => continue,
                    None => return None,
                }
            }
        }

        Some(positions)
    }

    /// Enter filter mode.
    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.ensure_selected_visible();
    }
    /// Leave filter mode, keeping the query applied.
    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }
    /// Clear the active filter and restore selection visibility.
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.ensure_selected_visible();
    }
    /// Append a character to the filter query and refresh view.
    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.selected = 0;
        self.ensure_selected_visible();
    }
    /// Remove the last character from the filter query and refresh view.
    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.ensure_selected_visible();
    }

    /// Keep `selected` on a selectable row, moving forward from it when needed.
    pub fn ensure_selected_visible(&mut self) {
        let rows = self.visible_rows();
        if rows.is_empty() {
            self.selected = 0;
            return;
        }
        let start = self.selected.min(rows.len() - 1);
        if let Some(i) = (start..rows.len())
            .chain(0..start)
            .find(|&i| rows[i].is_selectable())
        {
            self.selected = i;
        } else {
            self.selected = start;
        }
    }

    fn step(&mut self, forward: bool) {
        let rows = self.visible_rows();
        let n = rows.len();
        if n == 0 {
            return;
        }
        let mut i = self.selected.min(n - 1);
        for _ in 0..n {
            i = if forward { (i + 1) % n } else { (i + n - 1) % n };
            if rows[i].is_selectable() {
                self.selected = i;
                return;
            }
        }
    }

    /// Move selection to the next selectable row, wrapping around.
    pub fn next(&mut self) {
        self.step(true);
    }

    /// Move selection to the previous selectable row, wrapping around.
    pub fn prev(&mut self) {
        self.step(false);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_selected_visible();
    }

    pub fn select_last(&mut self) {
        if let Some(i) = self.visible_rows().iter().rposition(Row::is_selectable) {
            self.selected = i;
        }
    }
}
