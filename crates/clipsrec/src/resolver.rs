//! Media URL derivation.
//!
//! Preview images are named after the clip video: everything before the
//! `-preview` marker plus `.mp4` is the video URL.

use tracing::warn;

use crate::record::{ClipRecord, MediaSource};
use crate::{Error, Result};

pub const PREVIEW_MARKER: &str = "-preview";

/// Media URL of one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipUrl {
    pub url: String,
    /// Built from the tracking id alone; may well 404.
    pub fallback: bool,
}

/// A selected clip together with its media URL.
#[derive(Debug, Clone)]
pub struct ResolvedClip {
    pub record: ClipRecord,
    pub media: ClipUrl,
}

impl ResolvedClip {
    pub fn tracking_id(&self) -> &str {
        self.record.tracking_id()
    }
}

/// Turn a preview image URL into the clip video URL.
pub fn preview_to_media_url(preview_url: &str) -> Result<String> {
    let idx = preview_url.find(PREVIEW_MARKER).ok_or_else(|| {
        Error::contract(format!(
            "preview URL `{preview_url}` has no `{PREVIEW_MARKER}` marker"
        ))
    })?;
    Ok(format!("{}.mp4", &preview_url[..idx]))
}

/// Derive the media URL of a clip.
///
/// `fallback_template` is used when the record carries no preview data; its
/// `{}` placeholder receives the tracking id.
pub fn resolve(clip: &ClipRecord, fallback_template: &str) -> Result<ClipUrl> {
    match clip.media() {
        MediaSource::TrackingIdOnly => {
            let url = fallback_template.replace("{}", clip.tracking_id());
            warn!(
                tracking_id = %clip.tracking_id(),
                url = %url,
                "No preview data for clip; using best-effort media URL"
            );
            Ok(ClipUrl {
                url,
                fallback: true,
            })
        }
        source => {
            // Every other variant carries a preview URL.
            let preview = source.preview_url().unwrap_or_default();
            Ok(ClipUrl {
                url: preview_to_media_url(preview)?,
                fallback: false,
            })
        }
    }
}

/// Resolve every clip up front so a malformed record aborts the run before
/// anything is written.
pub fn resolve_all(clips: Vec<ClipRecord>, fallback_template: &str) -> Result<Vec<ResolvedClip>> {
    clips
        .into_iter()
        .map(|record| {
            let media = resolve(&record, fallback_template)?;
            Ok(ResolvedClip { record, media })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FALLBACK_MEDIA_TEMPLATE;
    use rstest::rstest;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ClipRecord {
        ClipRecord::decode(value).unwrap()
    }

    #[rstest]
    #[case::tiny(
        json!({ "tracking_id": "1", "thumbnails": { "tiny": "https://example/x-preview-someSize.jpg" } }),
        "https://example/x.mp4"
    )]
    #[case::vod(
        json!({ "tracking_id": "1", "vod": { "preview_image_url": "https://vod/abc-preview.jpg" } }),
        "https://vod/abc.mp4"
    )]
    #[case::medium(
        json!({ "tracking_id": "1", "thumbnails": { "medium": "https://clips-media-assets2.twitch.tv/AT-cm%7C392-preview-480x272.jpg" } }),
        "https://clips-media-assets2.twitch.tv/AT-cm%7C392.mp4"
    )]
    #[case::helix(
        json!({ "id": "Abc", "thumbnail_url": "https://clips-media-assets2.twitch.tv/157589949-preview-480x272.jpg" }),
        "https://clips-media-assets2.twitch.tv/157589949.mp4"
    )]
    #[case::first_marker(
        json!({ "tracking_id": "1", "thumbnails": { "tiny": "https://e/a-preview-b-preview.jpg" } }),
        "https://e/a.mp4"
    )]
    fn test_resolve_preview(#[case] raw: serde_json::Value, #[case] expected: &str) {
        let url = resolve(&record(raw), DEFAULT_FALLBACK_MEDIA_TEMPLATE).unwrap();
        assert_eq!(url.url, expected);
        assert!(!url.fallback);
    }

    #[test]
    fn test_resolve_fallback() {
        let clip = record(json!({ "tracking_id": "abc123", "duration": "10" }));
        let url = resolve(&clip, DEFAULT_FALLBACK_MEDIA_TEMPLATE).unwrap();
        assert!(url.fallback);
        assert!(url.url.contains("abc123"));
        assert_eq!(
            url.url,
            "https://clips-media-assets2.twitch.tv/AT-cm%7Cabc123.mp4"
        );
    }

    #[test]
    fn test_missing_marker_is_fatal() {
        let clip = record(json!({ "tracking_id": "1", "thumbnails": { "tiny": "https://e/x.jpg" } }));
        let err = resolve(&clip, DEFAULT_FALLBACK_MEDIA_TEMPLATE).unwrap_err();
        assert!(matches!(err, Error::DataContract(_)));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let clip = record(json!({
            "tracking_id": "1",
            "thumbnails": { "small": "https://e/y-preview-260x147.jpg" }
        }));
        let first = resolve(&clip, DEFAULT_FALLBACK_MEDIA_TEMPLATE).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&clip, DEFAULT_FALLBACK_MEDIA_TEMPLATE).unwrap(), first);
        }
    }

    #[test]
    fn test_resolve_all_stops_on_bad_record() {
        let clips = vec![
            record(json!({ "tracking_id": "1" })),
            record(json!({ "tracking_id": "2", "thumbnails": { "tiny": "https://e/no-marker.jpg" } })),
        ];
        assert!(resolve_all(clips, DEFAULT_FALLBACK_MEDIA_TEMPLATE).is_err());
    }
}
