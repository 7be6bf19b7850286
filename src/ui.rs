//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Padding, Paragraph, Tabs, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::{App, Row, RowKind, TABS, View};
use crate::audio::EngineStatus;
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::{Track, display_from_fields};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("1-4".to_string(), "views".to_string());
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "open/play".to_string());
    map.insert("bksp".to_string(), "back".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next song".to_string());
    // H/L is filled dynamically from config.
    map.insert("+/-".to_string(), "volume".to_string());
    map.insert("a".to_string(), "queue".to_string());
    map.insert("P".to_string(), "play album".to_string());
    map.insert("d/c".to_string(), "remove/clear queue".to_string());
    map.insert("r".to_string(), "retry".to_string());
    map.insert("R".to_string(), "refresh".to_string());
    map.insert("/".to_string(), "filter".to_string());
    map.insert("K".to_string(), "metadata".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "1-4", "j/k", "enter", "bksp", "space/p", "h/l", "H/L", "+/-", "a", "P", "d/c", "r",
        "R", "gg/G", "/", "K", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] scrub -/+{}s", scrub_seconds))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Engine state the status box shows.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackView {
    pub status: EngineStatus,
    pub position: f64,
    pub duration: Option<f64>,
    pub volume: f32,
    pub refreshing: bool,
}

fn secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or_default()
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format an optional duration in seconds, rounding up partial seconds.
fn format_duration_mmss_ceil(d: Option<f64>) -> String {
    let Some(d) = d.map(secs) else {
        return "-".to_string();
    };

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02} ({}s)", minutes, seconds, total_secs)
}

fn status_text(app: &App, playback: &PlaybackView, ui: &UiSettings) -> String {
    let mut parts: Vec<String> = Vec::new();

    match app.store.current_track() {
        Some(track) => {
            let song = display_from_fields(
                track,
                &ui.now_playing_track_fields,
                &ui.now_playing_track_separator,
            );
            let time = now_playing_time_text(
                secs(playback.position),
                playback.duration.map(secs),
                ui,
            );
            match time {
                Some(time) => parts.push(format!("Song: {} [{}]", song, time)),
                None => parts.push(format!("Song: {}", song)),
            }
            parts.push(playback.status.label().to_string());
        }
        None => parts.push("Stopped".to_string()),
    }

    parts.push(format!("Vol: {:.0}%", playback.volume * 100.0));
    parts.push(format!("Queue: {}", app.store.queue().len()));

    let catalog = app.store.catalog();
    let mut library = format!("Library: {} tracks", catalog.len());
    if let Some(at) = catalog.last_fetched() {
        library.push_str(&format!(" (refreshed {})", at.format("%Y-%m-%d %H:%M")));
    }
    if playback.refreshing {
        library.push_str(" refreshing...");
    }
    parts.push(library);

    let q = app.filter_query.trim();
    if app.filter_mode || !q.is_empty() {
        let mut filter_part = String::from("FILTER:");
        if !q.is_empty() {
            filter_part.push(' ');
            filter_part.push_str(q);
        }
        parts.push(filter_part);
    }

    if let Some(msg) = &app.message {
        parts.push(msg.clone());
    }

    parts.join(" • ")
}

/// Uppercase the characters the filter matched, the way the list highlights hits.
fn highlight(label: &str, query: &str) -> String {
    let Some(positions) = App::fuzzy_match_positions(label, query) else {
        return label.to_string();
    };
    let mut rendered = String::new();
    let mut pos_iter = positions.into_iter();
    let mut next_pos = pos_iter.next();

    for (ci, ch) in label.chars().enumerate() {
        if next_pos == Some(ci) {
            for up in ch.to_uppercase() {
                rendered.push(up);
            }
            next_pos = pos_iter.next();
        } else {
            rendered.push(ch);
        }
    }
    rendered
}

fn track_metadata_text(track: &Track) -> String {
    let genre = track
        .genre
        .as_ref()
        .map(|g| g.join(", "))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Title: {}\nArtist: {}\nAlbum: {}\nYear: {}\nGenre: {}\nDuration: {}\nBitrate: {}\nFile: {} ({})",
        track.display_title(),
        track.artist.as_deref().unwrap_or("-"),
        track.album.as_deref().unwrap_or("-"),
        track.year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
        genre,
        format_duration_mmss_ceil(track.duration),
        track
            .bitrate
            .map(|b| format!("{:.0} kbps", b / 1000.0))
            .unwrap_or_else(|| "-".into()),
        track.name,
        track.mime_type.as_deref().unwrap_or("unknown type"),
    )
}

fn artist_text(app: &App, name: &str) -> String {
    match app.store.cache().artist(name) {
        Some(info) => {
            let mut lines: Vec<String> = Vec::new();
            if let Some(listeners) = info.listeners {
                lines.push(format!("Listeners: {listeners}"));
            }
            if let Some(plays) = info.playcount {
                lines.push(format!("Plays: {plays}"));
            }
            if !info.tags.is_empty() {
                lines.push(format!("Tags: {}", info.tags.join(", ")));
            }
            if let Some(bio) = &info.bio {
                lines.push(String::new());
                lines.push(bio.clone());
            }
            if lines.is_empty() {
                "No details available.".to_string()
            } else {
                lines.join("\n")
            }
        }
        None => "Looking up artist...".to_string(),
    }
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw(
    frame: &mut Frame,
    app: &App,
    rows: &[Row],
    playback: &PlaybackView,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Tabs::new(TABS.iter().map(|t| Line::from(*t)))
        .select(app.view.tab())
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(ui_settings.header_text.as_str())
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    // Status box
    let status_par = Paragraph::new(status_text(app, playback, ui_settings))
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Main area: the list, plus an artist panel on artist pages.
    let (list_area, side_area) = match &app.view {
        View::Artist(_) => {
            let split = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[2]);
            (split[0], Some(split[1]))
        }
        _ => (chunks[2], None),
    };

    {
        let q = app.filter_query.trim();

        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let total = rows.len();
        let list_height = list_area.height.saturating_sub(2) as usize;
        let sel_pos = app.selected.min(total.saturating_sub(1));
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = if sel_pos > half { sel_pos - half } else { 0 };
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let current_id = app.store.current_track().map(|t| t.id.as_str());
        let visible_items: Vec<ListItem> = rows[start..end]
            .iter()
            .map(|row| match &row.kind {
                RowKind::Heading => ListItem::new(row.label.as_str()).bold(),
                kind => {
                    let label = if q.is_empty() {
                        row.label.clone()
                    } else {
                        highlight(&row.label, q)
                    };
                    let item = ListItem::new(label);
                    let is_current = matches!(kind, RowKind::Track { track, .. } if Some(track.id.as_str()) == current_id);
                    if is_current { item.italic() } else { item }
                }
            })
            .collect();

        let list = List::new(visible_items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", app.view.title())),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, list_area, &mut state);
    }

    if let (Some(area), Some(name)) = (side_area, app.wanted_artist()) {
        let panel = Paragraph::new(artist_text(app, name))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {name} "))
                    .padding(Padding {
                        left: 1,
                        right: 1,
                        top: 0,
                        bottom: 0,
                    }),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(panel, area);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let popup_area = centered_rect_sized(72, 12, list_area);
        frame.render_widget(Clear, popup_area);

        let selected = rows.get(app.selected);
        let meta = match selected {
            Some(row) => match row.track() {
                Some(track) => track_metadata_text(track),
                None => row.label.clone(),
            },
            None => "Nothing selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    let footer_text = controls_text(controls_settings.scrub_seconds);
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[3]);
}
