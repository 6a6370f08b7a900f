//! Normalized clip records.
//!
//! The catalog endpoints return loosely shaped JSON. [`ClipRecord::decode`] is
//! the only place that probes optional fields; everything downstream works on
//! [`ClipRecord`] and [`MediaSource`].

use serde_json::Value;

use crate::{Error, Result};

/// Thumbnail sizes carrying a preview URL, in lookup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailSize {
    Tiny,
    Small,
    Medium,
}

impl ThumbnailSize {
    pub const PRIORITY: [ThumbnailSize; 3] = [Self::Tiny, Self::Small, Self::Medium];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tiny => "tiny",
            Self::Small => "small",
            Self::Medium => "medium",
        }
    }
}

/// Where the media URL of a clip comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// `vod.preview_image_url`
    VodPreview(String),
    /// `thumbnails.<size>`
    Thumbnail { size: ThumbnailSize, url: String },
    /// Helix `thumbnail_url`
    HelixThumbnail(String),
    /// No preview data; only the tracking id is usable.
    TrackingIdOnly,
}

impl MediaSource {
    /// Preview image URL, if the record carried one.
    pub fn preview_url(&self) -> Option<&str> {
        match self {
            Self::VodPreview(url) | Self::HelixThumbnail(url) => Some(url),
            Self::Thumbnail { url, .. } => Some(url),
            Self::TrackingIdOnly => None,
        }
    }

    fn probe(raw: &Value) -> Self {
        if let Some(url) = non_empty_str(raw.pointer("/vod/preview_image_url")) {
            return Self::VodPreview(url.to_owned());
        }

        if let Some(thumbnails) = raw.get("thumbnails") {
            for size in ThumbnailSize::PRIORITY {
                if let Some(url) = non_empty_str(thumbnails.get(size.as_str())) {
                    return Self::Thumbnail {
                        size,
                        url: url.to_owned(),
                    };
                }
            }
        }

        if let Some(url) = non_empty_str(raw.get("thumbnail_url")) {
            return Self::HelixThumbnail(url.to_owned());
        }

        Self::TrackingIdOnly
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// One clip as listed by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRecord {
    tracking_id: String,
    duration: Option<String>,
    media: MediaSource,
    raw: Value,
}

impl ClipRecord {
    /// Normalize a raw catalog entry.
    ///
    /// The id is `tracking_id` when present, `id` otherwise (Helix). The
    /// declared duration is kept as text and parsed by the selector.
    pub fn decode(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::contract(format!(
                "clip record is not an object: {raw}"
            )));
        }

        let tracking_id = ["tracking_id", "id"]
            .iter()
            .find_map(|key| match raw.get(*key) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| Error::contract("clip record has neither `tracking_id` nor `id`"))?;

        if tracking_id.contains(['/', '\\']) || tracking_id == "." || tracking_id == ".." {
            return Err(Error::contract(format!(
                "clip id `{tracking_id}` cannot be used as a file name"
            )));
        }

        let duration = match raw.get("duration") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let media = MediaSource::probe(&raw);

        Ok(Self {
            tracking_id,
            duration,
            media,
            raw,
        })
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    /// Declared duration as listed, before parsing.
    pub fn declared_duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    /// Declared duration in seconds.
    ///
    /// Missing, non-numeric, negative or non-finite values break the data
    /// contract and are fatal.
    pub fn duration_secs(&self) -> Result<f64> {
        let text = self.duration.as_deref().ok_or_else(|| {
            Error::contract(format!("clip `{}` has no duration", self.tracking_id))
        })?;
        let secs: f64 = text.trim().parse().map_err(|_| {
            Error::contract(format!(
                "clip `{}` has a non-numeric duration `{text}`",
                self.tracking_id
            ))
        })?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(Error::contract(format!(
                "clip `{}` has an invalid duration `{text}`",
                self.tracking_id
            )));
        }
        Ok(secs)
    }

    pub fn media(&self) -> &MediaSource {
        &self.media
    }

    /// The record exactly as the catalog returned it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn title(&self) -> Option<&str> {
        self.raw.get("title").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vod_preview_wins() {
        let record = ClipRecord::decode(json!({
            "tracking_id": "1",
            "duration": "30",
            "vod": { "preview_image_url": "https://v/a-preview.jpg" },
            "thumbnails": { "tiny": "https://t/b-preview-86x45.jpg" }
        }))
        .unwrap();
        assert_eq!(
            record.media(),
            &MediaSource::VodPreview("https://v/a-preview.jpg".to_string())
        );
    }

    #[test]
    fn test_thumbnail_priority() {
        let record = ClipRecord::decode(json!({
            "tracking_id": "1",
            "thumbnails": {
                "medium": "https://t/m-preview.jpg",
                "small": "https://t/s-preview.jpg"
            }
        }))
        .unwrap();
        assert_eq!(
            record.media(),
            &MediaSource::Thumbnail {
                size: ThumbnailSize::Small,
                url: "https://t/s-preview.jpg".to_string()
            }
        );
    }

    #[test]
    fn test_vod_without_preview_falls_through() {
        let record = ClipRecord::decode(json!({
            "tracking_id": "1",
            "vod": { "id": "123", "url": "https://www.twitch.tv/videos/123" },
            "thumbnails": { "medium": "https://t/m-preview.jpg" }
        }))
        .unwrap();
        assert_eq!(
            record.media().preview_url(),
            Some("https://t/m-preview.jpg")
        );
    }

    #[test]
    fn test_helix_shape() {
        let record = ClipRecord::decode(json!({
            "id": "AwkwardHelplessSalamanderSwiftRage",
            "thumbnail_url": "https://clips-media-assets2.twitch.tv/157589949-preview-480x272.jpg",
            "duration": 28.4
        }))
        .unwrap();
        assert_eq!(record.tracking_id(), "AwkwardHelplessSalamanderSwiftRage");
        assert_eq!(record.declared_duration(), Some("28.4"));
        assert!(matches!(record.media(), MediaSource::HelixThumbnail(_)));
    }

    #[test]
    fn test_no_media_fields() {
        let record = ClipRecord::decode(json!({ "tracking_id": "abc123", "duration": "12" })).unwrap();
        assert_eq!(record.media(), &MediaSource::TrackingIdOnly);
        assert_eq!(record.media().preview_url(), None);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let err = ClipRecord::decode(json!({ "duration": "12" })).unwrap_err();
        assert!(matches!(err, Error::DataContract(_)));
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(ClipRecord::decode(json!("clip")).is_err());
    }

    #[test]
    fn test_path_like_id_is_rejected() {
        assert!(ClipRecord::decode(json!({ "tracking_id": "../etc" })).is_err());
    }

    #[test]
    fn test_duration_parsing() {
        let record = ClipRecord::decode(json!({ "tracking_id": "1", "duration": "29.5" })).unwrap();
        assert_eq!(record.duration_secs().unwrap(), 29.5);

        let record = ClipRecord::decode(json!({ "tracking_id": "1", "duration": 12 })).unwrap();
        assert_eq!(record.duration_secs().unwrap(), 12.0);
    }

    #[test]
    fn test_bad_durations() {
        for duration in [json!("abc"), json!("-1"), json!("NaN"), json!(null)] {
            let record =
                ClipRecord::decode(json!({ "tracking_id": "1", "duration": duration })).unwrap();
            assert!(matches!(
                record.duration_secs(),
                Err(Error::DataContract(_))
            ));
        }
    }

    #[test]
    fn test_raw_is_preserved() {
        let raw = json!({ "tracking_id": "1", "duration": "3", "views": 42, "title": "gg" });
        let record = ClipRecord::decode(raw.clone()).unwrap();
        assert_eq!(record.raw(), &raw);
        assert_eq!(record.title(), Some("gg"));
    }
}
