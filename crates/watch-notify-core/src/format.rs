//! Message bodies for the channel, in Telegram's HTML parse mode.

use chrono::{DateTime, Duration, Utc};
use watch_notify_models::{EnrichmentResult, ExternalRatings, WatchEvent};

/// Telegram rejects photo captions longer than this (in characters)
pub const CAPTION_LIMIT: usize = 1024;

const NOT_AVAILABLE: &str = "N/A";
const NO_OVERVIEW: &str = "No overview available.";

/// Fixed UTC offset used for display. No timezone database, no DST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayZone {
    offset_hours: i32,
    label: String,
}

impl DisplayZone {
    pub fn new(offset_hours: i32, label: impl Into<String>) -> Self {
        Self {
            offset_hours,
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self::new(7, "WIB")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `DD-MM-YYYY HH:MM <label>`
pub fn format_watched_at(at: DateTime<Utc>, zone: &DisplayZone) -> String {
    let shifted = at.naive_utc() + Duration::hours(i64::from(zone.offset_hours));
    format!("{} {}", shifted.format("%d-%m-%Y %H:%M"), zone.label)
}

pub fn format_runtime(minutes: Option<u32>) -> String {
    let minutes = match minutes {
        Some(m) if m > 0 => m,
        _ => return NOT_AVAILABLE.to_string(),
    };
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, m) => format!("{}m", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

pub fn format_genres(genres: &[String]) -> String {
    if genres.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        genres.join(", ")
    }
}

fn year_or_na(year: Option<u32>) -> String {
    year.map(|y| y.to_string()).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Who watched what, and when
pub fn first_message(
    event: &WatchEvent,
    display_name: &str,
    channel_handle: Option<&str>,
    zone: &DisplayZone,
) -> String {
    let who = match channel_handle.map(|h| h.trim().trim_start_matches('@')).filter(|h| !h.is_empty()) {
        Some(handle) => format!(
            "<a href=\"https://t.me/{}\">{}</a>",
            escape_html(handle),
            escape_html(display_name)
        ),
        None => escape_html(display_name),
    };

    format!(
        "👤 {} Just Watched <b>{}</b>\n<b>Released:</b> {}\n<b>Watched:</b> {}",
        who,
        escape_html(&event.display_title()),
        year_or_na(event.year),
        format_watched_at(event.watched_at, zone)
    )
}

/// Details card: ratings, runtime, synopsis, genres. Fits in a photo caption.
pub fn second_message(
    event: &WatchEvent,
    source_rating: Option<&str>,
    enrichment: Option<&EnrichmentResult>,
    external: &ExternalRatings,
) -> String {
    let tmdb_rating = enrichment
        .and_then(|e| e.vote_average)
        .map(|avg| format!("{:.1}", avg));
    let vote_count = enrichment.and_then(|e| e.vote_count).unwrap_or(0);
    let runtime = format_runtime(enrichment.and_then(|e| e.runtime_minutes));
    let genres = escape_html(&format_genres(enrichment.map(|e| e.genres.as_slice()).unwrap_or(&[])));
    let overview = enrichment
        .and_then(|e| e.synopsis())
        .unwrap_or(NO_OVERVIEW);

    let rating_line = |value: Option<&str>| match value {
        Some(v) => format!("<b>{}/10</b>", escape_html(v)),
        None => NOT_AVAILABLE.to_string(),
    };
    // Already a percentage, e.g. "85%"
    let tomatometer = match external.tomatometer.as_deref() {
        Some(v) => format!("<b>{}</b>", escape_html(v)),
        None => NOT_AVAILABLE.to_string(),
    };

    let head = format!(
        "<b>{}</b> ({})\n\n⭐ <b>{}</b> ({} votes)\n🕐 <b>{}</b>\n\n<blockquote>",
        escape_html(&event.title),
        year_or_na(event.year),
        tmdb_rating.as_deref().map(|r| format!("{}/10", r)).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        vote_count,
        runtime
    );
    let tail = format!(
        "</blockquote>\n\n<b>Genres</b> {}\n\n<b>Ratings</b>\n▪️ <b>Trakt</b>   {}\n▪️ <b>TMDB</b>   {}\n▪️ <b>IMDb</b>   {}\n▪️ <b>Tomatometer</b>   {}",
        genres,
        rating_line(source_rating),
        rating_line(tmdb_rating.as_deref()),
        rating_line(external.imdb.as_deref()),
        tomatometer
    );

    let budget = CAPTION_LIMIT.saturating_sub(head.chars().count() + tail.chars().count());
    format!("{}{}{}", head, truncate_escaped(overview, budget), tail)
}

/// Escape `text` and cut it so the escaped form is at most `budget`
/// characters, ending in an ellipsis when shortened. Never splits an entity.
fn truncate_escaped(text: &str, budget: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= budget {
        return escaped;
    }
    if budget == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let piece = escape_html(c.encode_utf8(&mut [0u8; 4]));
        let len = piece.chars().count();
        if used + len + 1 > budget {
            break;
        }
        out.push_str(&piece);
        used += len;
    }
    let trimmed = out.trim_end().to_string();
    format!("{}…", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use watch_notify_models::{CrossRefIds, EpisodeRef, MediaKind};

    fn movie() -> WatchEvent {
        WatchEvent {
            id: "1982345".to_string(),
            kind: MediaKind::Movie,
            title: "The Matrix".to_string(),
            year: Some(1999),
            watched_at: Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap(),
            ids: CrossRefIds {
                trakt_id: Some(481),
                tmdb_id: Some(603),
                imdb_id: Some("tt0133093".to_string()),
            },
            episode: None,
        }
    }

    fn enrichment() -> EnrichmentResult {
        EnrichmentResult {
            vote_average: Some(8.216),
            vote_count: Some(25000),
            runtime_minutes: Some(136),
            overview: Some("Neo learns the truth.".to_string()),
            genres: vec!["Action".to_string(), "Science Fiction".to_string()],
            poster_path: Some("/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg".to_string()),
        }
    }

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(None), "N/A");
        assert_eq!(format_runtime(Some(0)), "N/A");
        assert_eq!(format_runtime(Some(125)), "2h 5m");
        assert_eq!(format_runtime(Some(60)), "1h");
        assert_eq!(format_runtime(Some(45)), "45m");
    }

    #[test]
    fn test_format_watched_at_crosses_midnight() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();
        assert_eq!(format_watched_at(at, &DisplayZone::default()), "02-01-2024 06:30 WIB");
        assert_eq!(format_watched_at(at, &DisplayZone::new(-5, "EST")), "01-01-2024 18:30 EST");
    }

    #[test]
    fn test_first_message_with_handle() {
        let text = first_message(&movie(), "Alice", Some("@alice_watches"), &DisplayZone::default());
        assert_eq!(
            text,
            "👤 <a href=\"https://t.me/alice_watches\">Alice</a> Just Watched <b>The Matrix</b>\n\
             <b>Released:</b> 1999\n\
             <b>Watched:</b> 02-01-2024 06:30 WIB"
        );
    }

    #[test]
    fn test_first_message_episode_without_handle() {
        let mut event = movie();
        event.kind = MediaKind::ShowEpisode;
        event.title = "Tom & Jerry".to_string();
        event.year = None;
        event.episode = Some(EpisodeRef { season: Some(1), number: Some(2), title: None });

        let text = first_message(&event, "Bob", None, &DisplayZone::default());
        assert!(text.starts_with("👤 Bob Just Watched <b>Tom &amp; Jerry S01E02</b>"));
        assert!(text.contains("<b>Released:</b> N/A"));
    }

    #[test]
    fn test_second_message_with_enrichment() {
        let external = ExternalRatings {
            imdb: Some("8.7".to_string()),
            tomatometer: Some("83%".to_string()),
        };
        let text = second_message(&movie(), None, Some(&enrichment()), &external);

        assert!(text.starts_with("<b>The Matrix</b> (1999)"));
        assert!(text.contains("⭐ <b>8.2/10</b> (25000 votes)"));
        assert!(text.contains("🕐 <b>2h 16m</b>"));
        assert!(text.contains("<blockquote>Neo learns the truth.</blockquote>"));
        assert!(text.contains("<b>Genres</b> Action, Science Fiction"));
        assert!(text.contains("<b>Trakt</b>   N/A"));
        assert!(text.contains("<b>TMDB</b>   <b>8.2/10</b>"));
        assert!(text.contains("<b>IMDb</b>   <b>8.7/10</b>"));
        assert!(text.ends_with("<b>Tomatometer</b>   <b>83%</b>"));
    }

    #[test]
    fn test_second_message_degraded() {
        let text = second_message(&movie(), None, None, &ExternalRatings::default());

        assert!(text.contains("⭐ <b>N/A</b> (0 votes)"));
        assert!(text.contains("🕐 <b>N/A</b>"));
        assert!(text.contains("<blockquote>No overview available.</blockquote>"));
        assert!(text.contains("<b>Genres</b> N/A"));
        assert!(text.contains("<b>TMDB</b>   N/A"));
        assert!(text.contains("<b>IMDb</b>   N/A"));
        assert!(text.contains("<b>Tomatometer</b>   N/A"));
    }

    #[test]
    fn test_long_overview_fits_caption() {
        let mut long = enrichment();
        long.overview = Some("A <very> long & winding synopsis. ".repeat(80));

        let text = second_message(&movie(), None, Some(&long), &ExternalRatings::default());
        assert!(text.chars().count() <= CAPTION_LIMIT);
        assert!(text.contains("…</blockquote>"));
        assert!(text.ends_with("N/A"));

        let inner = text.split("<blockquote>").nth(1).unwrap();
        let inner = inner.split("</blockquote>").next().unwrap();
        assert!(!inner.contains("&am…") && !inner.contains("&l…"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\" > d"), "a &lt; b &amp; &quot;c&quot; &gt; d");
    }
}
