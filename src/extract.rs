use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::models::{ExtractionResult, ImageItem};

// ── Constants ────────────────────────────────────────────────────────────────

const ENCODED_AMPERSAND: &str = "&#38;";

// ── Lazy static selectors ────────────────────────────────────────────────────

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".video-info h3").unwrap());

static COVER_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse(".video-info > img").unwrap());

static IMAGE_ITEM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".images-grid .image-item").unwrap());

static DOWNLOAD_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".download-links a").unwrap());

static ANCHOR_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

static IMG_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());

// ── Link classification ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    NoWatermarkHd,
    NoWatermark,
    Watermark,
    Mp3,
}

/// Order matters: "without watermark" also contains "watermark".
fn classify_label(label: &str) -> Option<LinkKind> {
    let label = label.to_lowercase();
    if label.contains("without watermark") && label.contains("hd") {
        Some(LinkKind::NoWatermarkHd)
    } else if label.contains("without watermark") {
        Some(LinkKind::NoWatermark)
    } else if label.contains("watermark") {
        Some(LinkKind::Watermark)
    } else if label.contains("mp3") {
        Some(LinkKind::Mp3)
    } else {
        None
    }
}

// ── Main extraction pipeline ─────────────────────────────────────────────────

pub fn extract_from_html(html: &str) -> ExtractionResult {
    let document = Html::parse_document(html);

    let mut result = ExtractionResult {
        title: extract_title(&document),
        cover: extract_cover(&document),
        images: extract_gallery(&document),
        ..Default::default()
    };

    for anchor in document.select(&DOWNLOAD_LINK_SEL) {
        let href = match decode_entities(anchor.value().attr("href")) {
            Some(h) => h,
            None => continue,
        };
        // Later anchors of the same kind overwrite earlier ones.
        match classify_label(&collect_text(anchor)) {
            Some(LinkKind::NoWatermarkHd) => result.videos.nowm_hd = Some(href),
            Some(LinkKind::NoWatermark) => result.videos.nowm = Some(href),
            Some(LinkKind::Watermark) => result.videos.wm = Some(href),
            Some(LinkKind::Mp3) => result.mp3 = Some(href),
            None => {}
        }
    }

    result
}

fn extract_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SEL)
        .next()
        .map(|el| collect_text(el).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_cover(document: &Html) -> Option<String> {
    let img = document.select(&COVER_SEL).next()?;
    decode_entities(img.value().attr("src"))
}

fn extract_gallery(document: &Html) -> Vec<ImageItem> {
    document
        .select(&IMAGE_ITEM_SEL)
        .filter_map(resolve_gallery_item)
        .enumerate()
        .map(|(idx, url)| ImageItem { index: idx + 1, url })
        .collect()
}

/// Anchor `href` wins over image `src`; an empty attribute counts as missing.
fn resolve_gallery_item(item: ElementRef<'_>) -> Option<String> {
    let href = item
        .select(&ANCHOR_SEL)
        .next()
        .and_then(|a| a.value().attr("href"))
        .filter(|h| !h.is_empty());
    let src = || {
        item.select(&IMG_SEL)
            .next()
            .and_then(|img| img.value().attr("src"))
    };
    decode_entities(href.or_else(src))
}

// ── Entity decoding ──────────────────────────────────────────────────────────

/// Decode the `&#38;` escape back to `&`, repeating until none remain so the
/// output never contains the escape. Missing or empty input yields `None`.
pub fn decode_entities(raw: Option<&str>) -> Option<String> {
    let raw = raw.filter(|s| !s.is_empty())?;
    let mut decoded = raw.to_string();
    while decoded.contains(ENCODED_AMPERSAND) {
        decoded = decoded.replace(ENCODED_AMPERSAND, "&");
    }
    Some(decoded)
}

// ── DOM utility helpers ──────────────────────────────────────────────────────

/// Concatenated text of an element and all its descendants.
fn collect_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const VIDEO_PAGE: &str = r#"
        <div class="video-info">
            <img src="https://cdn.example/cover.jpg?a=1&amp;#38;b=2">
            <div class="meta"><h3>  A caption  </h3><h3>second</h3></div>
        </div>
        <div class="download-links">
            <a href="https://cdn.example/nowm.mp4">Download Video (Without Watermark)</a>
            <a href="https://cdn.example/hd.mp4">Download Video (Without Watermark HD)</a>
            <a href="https://cdn.example/wm.mp4">Download Video (Watermark)</a>
            <a href="https://cdn.example/audio.mp3">Download <span>MP3</span></a>
            <a href="https://cdn.example/other">Share</a>
        </div>
    "#;

    #[test]
    fn extracts_single_video_post() {
        let result = extract_from_html(VIDEO_PAGE);
        assert_eq!(result.title.as_deref(), Some("A caption"));
        assert_eq!(
            result.cover.as_deref(),
            Some("https://cdn.example/cover.jpg?a=1&b=2")
        );
        assert!(result.images.is_empty());
        assert_eq!(result.videos.nowm.as_deref(), Some("https://cdn.example/nowm.mp4"));
        assert_eq!(result.videos.nowm_hd.as_deref(), Some("https://cdn.example/hd.mp4"));
        assert_eq!(result.videos.wm.as_deref(), Some("https://cdn.example/wm.mp4"));
        assert_eq!(result.mp3.as_deref(), Some("https://cdn.example/audio.mp3"));
        assert!(!result.is_empty());
    }

    #[test]
    fn hd_label_is_never_plain_nowm_or_wm() {
        let html = r#"<div class="download-links">
            <a href="a&#38;b">Download Video (Without Watermark HD)</a>
        </div>"#;
        let result = extract_from_html(html);
        assert_eq!(result.videos.nowm_hd.as_deref(), Some("a&b"));
        assert!(result.videos.nowm.is_none());
        assert!(result.videos.wm.is_none());
        assert!(result.mp3.is_none());
    }

    #[test]
    fn classification_priority() {
        assert_eq!(
            classify_label("WITHOUT WATERMARK HD"),
            Some(LinkKind::NoWatermarkHd)
        );
        assert_eq!(classify_label("without watermark"), Some(LinkKind::NoWatermark));
        assert_eq!(classify_label("with watermark"), Some(LinkKind::Watermark));
        assert_eq!(classify_label("watermark mp3"), Some(LinkKind::Watermark));
        assert_eq!(classify_label("audio mp3"), Some(LinkKind::Mp3));
        assert_eq!(classify_label("download"), None);
    }

    #[test]
    fn later_links_of_same_kind_overwrite_and_empty_hrefs_are_skipped() {
        let html = r#"<div class="download-links">
            <a href="first.mp3">MP3</a>
            <a href="second.mp3">MP3</a>
            <a href="">MP3</a>
            <a>MP3</a>
        </div>"#;
        let result = extract_from_html(html);
        assert_eq!(result.mp3.as_deref(), Some("second.mp3"));
    }

    #[test]
    fn gallery_keeps_document_order_and_numbers_resolved_items() {
        let html = r#"<div class="images-grid">
            <div class="image-item"><a href="https://cdn.example/1.jpg"><img src="thumb1.jpg"></a></div>
            <div class="image-item"><span>broken</span></div>
            <div class="image-item"><img src="https://cdn.example/3.jpg?x=1&#38;y=2"></div>
            <div class="image-item"><a href=""><img src="https://cdn.example/4.jpg"></a></div>
        </div>"#;
        let result = extract_from_html(html);
        assert_eq!(
            result.images,
            vec![
                ImageItem { index: 1, url: "https://cdn.example/1.jpg".to_string() },
                ImageItem { index: 2, url: "https://cdn.example/3.jpg?x=1&y=2".to_string() },
                ImageItem { index: 3, url: "https://cdn.example/4.jpg".to_string() },
            ]
        );
        assert!(!result.is_empty());
    }

    #[test]
    fn missing_regions_yield_empty_result() {
        let result = extract_from_html("<html><body><p>Nothing here</p></body></html>");
        assert_eq!(result, ExtractionResult::default());
        assert!(result.is_empty());
    }

    #[test]
    fn cover_must_be_direct_child_and_blank_title_is_absent() {
        let html = r#"<div class="video-info">
            <div><img src="nested.jpg"></div>
            <h3>   </h3>
        </div>"#;
        let result = extract_from_html(html);
        assert!(result.cover.is_none());
        assert!(result.title.is_none());
    }

    #[test]
    fn decode_is_total_and_idempotent() {
        assert_eq!(decode_entities(None), None);
        assert_eq!(decode_entities(Some("")), None);
        for input in ["plain", "a&#38;b", "&#38;#38;", "&#38;&#38;#38;#38;", "&#3", "&amp;"] {
            let once = decode_entities(Some(input)).unwrap();
            assert!(!once.contains(ENCODED_AMPERSAND), "{input}");
            assert_eq!(decode_entities(Some(once.as_str())).as_deref(), Some(once.as_str()));
        }
        assert_eq!(decode_entities(Some("&#38;#38;")).as_deref(), Some("&"));
    }

    fn entity_heavy_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just("&#38;".to_string()),
                Just("#38;".to_string()),
                Just("&".to_string()),
                Just("&#3".to_string()),
                "[a-z8;#]{0,3}",
            ],
            0..16,
        )
        .prop_map(|parts| parts.concat())
    }

    /// Grid item kinds: 0 anchor href, 1 bare img src, 2 empty href with img
    /// src, 3 no link at all, 4 empty href without img.
    fn grid_item(kind: u8, pos: usize) -> (String, Option<String>) {
        let url = format!("https://cdn.example/{pos}.jpg?a=1&#38;b=2");
        let decoded = format!("https://cdn.example/{pos}.jpg?a=1&b=2");
        match kind {
            0 => (
                format!(r#"<div class="image-item"><a href="{url}"><img src="thumb.jpg"></a></div>"#),
                Some(decoded),
            ),
            1 => (
                format!(r#"<div class="image-item"><img src="{url}"></div>"#),
                Some(decoded),
            ),
            2 => (
                format!(r#"<div class="image-item"><a href=""><img src="{url}"></a></div>"#),
                Some(decoded),
            ),
            3 => (r#"<div class="image-item"><span>gone</span></div>"#.to_string(), None),
            _ => (r#"<div class="image-item"><a href="">gone</a></div>"#.to_string(), None),
        }
    }

    proptest! {
        #[test]
        fn decode_is_idempotent_for_any_text(s in ".*") {
            let once = decode_entities(Some(s.as_str()));
            let twice = once.as_deref().and_then(|o| decode_entities(Some(o)));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn decode_leaves_no_encoded_ampersand(s in entity_heavy_text()) {
            let once = decode_entities(Some(s.as_str()));
            if let Some(decoded) = &once {
                prop_assert!(!decoded.contains(ENCODED_AMPERSAND), "{:?} -> {:?}", s, decoded);
            } else {
                prop_assert!(s.is_empty());
            }
            let twice = once.as_deref().and_then(|o| decode_entities(Some(o)));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn gallery_numbers_resolved_items_in_source_order(
            kinds in prop::collection::vec(0u8..5, 0..20)
        ) {
            let mut html = String::from(r#"<div class="images-grid">"#);
            let mut expected = Vec::new();
            for (pos, kind) in kinds.iter().enumerate() {
                let (markup, url) = grid_item(*kind, pos);
                html.push_str(&markup);
                if let Some(url) = url {
                    expected.push(ImageItem { index: expected.len() + 1, url });
                }
            }
            html.push_str("</div>");

            let result = extract_from_html(&html);
            prop_assert_eq!(result.images.is_empty(), expected.is_empty());
            prop_assert_eq!(result.images, expected);
        }
    }
}
