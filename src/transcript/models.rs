//! Data models for diarized transcript lines.

use serde::{Deserialize, Deserializer, Serialize};

/// Episode identity fields carried by every line and copied onto chunks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeInfo {
    /// Episode ID (the YouTube video ID for published episodes).
    pub episode_id: String,
    /// Episode title.
    #[serde(default)]
    pub episode_name: String,
    /// Release date as supplied upstream (`YYYY-MM-DD`, optionally with a time part).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Guest featured in the episode.
    #[serde(default)]
    pub guest_name: Option<String>,
    /// Episode description.
    #[serde(default)]
    pub episode_description: Option<String>,
}

/// Per-episode performance snapshot attached to each line.
///
/// Every field is optional; upstream tables leave gaps for episodes whose
/// analytics have not been collected yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EpisodeMetrics {
    #[serde(deserialize_with = "lenient_count")]
    pub views: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub estimated_minutes_watched: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub average_view_duration: Option<i64>,
    pub average_view_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_count")]
    pub subscribers_gained: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub subscribers_lost: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub likes: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub dislikes: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub comments: Option<i64>,
    #[serde(deserialize_with = "lenient_count")]
    pub shares: Option<i64>,
    pub estimated_revenue: Option<f64>,
    /// How often this moment is replayed, 1.0 being the most replayed moment.
    pub intensity_score_normalized: Option<f64>,
    /// Retention compared to videos of similar length.
    pub relative_retention_performance: Option<f64>,
    /// Absolute ratio of viewers watching at this point.
    pub audience_watch_ratio: Option<f64>,
}

/// Count columns arrive as floats from some exports (`1234.0`).
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64))))
}

macro_rules! take_first_non_null {
    ($target:expr, $source:expr; $($field:ident),+ $(,)?) => {
        $(
            if $target.$field.is_none() {
                $target.$field = $source.$field;
            }
        )+
    };
}

impl EpisodeMetrics {
    /// Fill every still-empty field from `other`.
    ///
    /// Folding this over lines in order yields "first non-null wins".
    pub fn fill_missing_from(&mut self, other: &EpisodeMetrics) {
        take_first_non_null!(self, other;
            views,
            estimated_minutes_watched,
            average_view_duration,
            average_view_percentage,
            subscribers_gained,
            subscribers_lost,
            likes,
            dislikes,
            comments,
            shares,
            estimated_revenue,
            intensity_score_normalized,
            relative_retention_performance,
            audience_watch_ratio,
        );
    }

    /// Aggregate a snapshot from an ordered sequence of snapshots.
    pub fn first_non_null<'a>(snapshots: impl IntoIterator<Item = &'a EpisodeMetrics>) -> Self {
        snapshots.into_iter().fold(Self::default(), |mut acc, m| {
            acc.fill_missing_from(m);
            acc
        })
    }
}

/// One speaker-attributed utterance with time bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    #[serde(flatten)]
    pub episode: EpisodeInfo,
    /// Speaker label from diarization.
    #[serde(default)]
    pub speaker: String,
    /// Spoken text.
    #[serde(default)]
    pub line_text: String,
    /// Start time in seconds.
    pub start_time_seconds: f64,
    /// End time in seconds.
    pub end_time_seconds: f64,
    #[serde(flatten)]
    pub metrics: EpisodeMetrics,
}

impl TranscriptLine {
    /// Number of whitespace-separated words in the line.
    pub fn word_count(&self) -> usize {
        word_count(&self.line_text)
    }

    /// Text prefixed with the speaker label.
    pub fn labeled_text(&self) -> String {
        format!("{}: {}", self.speaker, self.line_text)
    }

    pub fn episode_id(&self) -> &str {
        &self.episode.episode_id
    }
}

/// All lines of one episode, ordered by start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLines {
    pub episode_id: String,
    pub lines: Vec<TranscriptLine>,
}

impl EpisodeLines {
    pub fn episode_name(&self) -> &str {
        self.lines
            .first()
            .map(|l| l.episode.episode_name.as_str())
            .unwrap_or_default()
    }

    pub fn word_count(&self) -> usize {
        self.lines.iter().map(TranscriptLine::word_count).sum()
    }
}

/// Group lines by episode, keeping episodes in first-appearance order and
/// sorting each episode's lines by start time.
pub fn group_by_episode(lines: Vec<TranscriptLine>) -> Vec<EpisodeLines> {
    let mut episodes: Vec<EpisodeLines> = Vec::new();

    for line in lines {
        match episodes
            .iter_mut()
            .find(|e| e.episode_id == line.episode.episode_id)
        {
            Some(episode) => episode.lines.push(line),
            None => episodes.push(EpisodeLines {
                episode_id: line.episode.episode_id.clone(),
                lines: vec![line],
            }),
        }
    }

    for episode in &mut episodes {
        // Stable sort keeps upstream order for lines sharing a start time.
        episode
            .lines
            .sort_by(|a, b| a.start_time_seconds.total_cmp(&b.start_time_seconds));
    }

    episodes
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(episode_id: &str, start: f64, text: &str) -> TranscriptLine {
        TranscriptLine {
            episode: EpisodeInfo {
                episode_id: episode_id.to_string(),
                ..Default::default()
            },
            speaker: "Host".to_string(),
            line_text: text.to_string(),
            start_time_seconds: start,
            end_time_seconds: start + 5.0,
            metrics: EpisodeMetrics::default(),
        }
    }

    #[test]
    fn test_deserialize_line_with_metrics() {
        let json = r#"{
            "episode_id": "abc123",
            "episode_name": "Sleep Science",
            "release_date": "2023-03-01",
            "guest_name": "Dr Smith",
            "speaker": "Speaker A",
            "line_text": "Hello there.",
            "start_time_seconds": 12.5,
            "end_time_seconds": 14.0,
            "views": 1500.0,
            "likes": 30,
            "intensityScoreNormalized": 0.42,
            "audienceWatchRatio": null
        }"#;

        let line: TranscriptLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.episode.episode_id, "abc123");
        assert_eq!(line.episode.release_date.as_deref(), Some("2023-03-01"));
        assert_eq!(line.episode.episode_description, None);
        assert_eq!(line.metrics.views, Some(1500));
        assert_eq!(line.metrics.likes, Some(30));
        assert_eq!(line.metrics.intensity_score_normalized, Some(0.42));
        assert_eq!(line.metrics.audience_watch_ratio, None);
        assert_eq!(line.labeled_text(), "Speaker A: Hello there.");
    }

    #[test]
    fn test_first_non_null_metrics() {
        let a = EpisodeMetrics {
            likes: Some(5),
            ..Default::default()
        };
        let b = EpisodeMetrics {
            views: Some(100),
            likes: Some(9),
            ..Default::default()
        };
        let c = EpisodeMetrics {
            views: Some(200),
            audience_watch_ratio: Some(0.7),
            ..Default::default()
        };

        let merged = EpisodeMetrics::first_non_null([&a, &b, &c]);
        assert_eq!(merged.likes, Some(5));
        assert_eq!(merged.views, Some(100));
        assert_eq!(merged.audience_watch_ratio, Some(0.7));
        assert_eq!(merged.shares, None);
    }

    #[test]
    fn test_group_by_episode() {
        let lines = vec![
            line("ep2", 10.0, "b"),
            line("ep1", 5.0, "second"),
            line("ep2", 0.0, "a"),
            line("ep1", 0.0, "first"),
        ];

        let grouped = group_by_episode(lines);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].episode_id, "ep2");
        assert_eq!(grouped[0].lines[0].line_text, "a");
        assert_eq!(grouped[1].lines[0].line_text, "first");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\tthree\nfour "), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(65.0), "01:05");
        assert_eq!(format_timestamp(3665.0), "01:01:05");
    }
}
