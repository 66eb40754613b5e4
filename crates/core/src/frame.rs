use std::{io::Cursor, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use tokio::time::Instant;

use crate::{error::Result, types::ClickPoint};

pub const FALLBACK_WIDTH: u32 = 1280;
pub const FALLBACK_HEIGHT: u32 = 720;
const MARKER_RADIUS_RATIO: f64 = 0.15;
const MARKER_COLOR: [u8; 3] = [255, 0, 0];
const MARKER_ALPHA: f64 = 0.5;

pub const TOOLTIP_TTL: Duration = Duration::from_secs(5);
pub const ANNOTATION_TTL: Duration = Duration::from_millis(8400);
const TOOLTIP_OFFSET: f64 = 12.0;
const TOOLTIP_INSET: f64 = 4.0;
const TOOLTIP_FALLBACK: Size = Size {
    width: 160.0,
    height: 44.0,
};

/// Source of the frame currently on screen.
pub trait FrameSource {
    /// `None` when nothing has been decoded yet.
    fn current_frame(&mut self) -> Result<Option<DynamicImage>>;
}

impl FrameSource for DynamicImage {
    fn current_frame(&mut self) -> Result<Option<DynamicImage>> {
        Ok(Some(self.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Top-left corner for the "explain" tooltip: offset from the click, then
/// pulled back so it stays inside the video with a small inset.
pub fn place_tooltip(point: ClickPoint, video: Size, tooltip: Size) -> (f64, f64) {
    let tw = if tooltip.width > 0.0 { tooltip.width } else { TOOLTIP_FALLBACK.width };
    let th = if tooltip.height > 0.0 { tooltip.height } else { TOOLTIP_FALLBACK.height };

    let mut x = point.x * video.width + TOOLTIP_OFFSET;
    let mut y = point.y * video.height + TOOLTIP_OFFSET;
    if x + tw > video.width - TOOLTIP_INSET {
        x = (video.width - tw - TOOLTIP_INSET).max(TOOLTIP_INSET);
    }
    if y + th > video.height - TOOLTIP_INSET {
        y = (video.height - th - TOOLTIP_INSET).max(TOOLTIP_INSET);
    }
    (x.max(TOOLTIP_INSET), y.max(TOOLTIP_INSET))
}

/// Transient overlay anchored at a click, shown until its deadline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub point: ClickPoint,
    pub until: Instant,
}

impl Overlay {
    pub fn tooltip(point: ClickPoint, now: Instant) -> Self {
        Self {
            point,
            until: now + TOOLTIP_TTL,
        }
    }

    pub fn annotation(point: ClickPoint, now: Instant) -> Self {
        Self {
            point,
            until: now + ANNOTATION_TTL,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.until
    }
}

/// Copy of `frame` with a translucent red disc over the clicked point.
/// An empty or missing frame yields a blank canvas of the fallback size.
pub fn mark_frame(frame: Option<&DynamicImage>, point: ClickPoint) -> RgbaImage {
    let mut canvas = match frame {
        Some(img) if img.width() > 0 && img.height() > 0 => img.to_rgba8(),
        _ => RgbaImage::new(FALLBACK_WIDTH, FALLBACK_HEIGHT),
    };
    draw_disc(&mut canvas, point);
    canvas
}

fn draw_disc(canvas: &mut RgbaImage, point: ClickPoint) {
    let (w, h) = (canvas.width(), canvas.height());
    let cx = point.x * f64::from(w);
    let cy = point.y * f64::from(h);
    let r = f64::from(h) * MARKER_RADIUS_RATIO;

    let x0 = (cx - r).floor().max(0.0) as u32;
    let y0 = (cy - r).floor().max(0.0) as u32;
    let x1 = ((cx + r).ceil() as u32).min(w);
    let y1 = ((cy + r).ceil() as u32).min(h);

    for y in y0..y1 {
        for x in x0..x1 {
            let dx = f64::from(x) + 0.5 - cx;
            let dy = f64::from(y) + 0.5 - cy;
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let px = canvas.get_pixel_mut(x, y);
            *px = blend(*px);
        }
    }
}

fn blend(dst: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = dst.0;
    let mix = |src: u8, over: u8| {
        (f64::from(over) * MARKER_ALPHA + f64::from(src) * (1.0 - MARKER_ALPHA)).round() as u8
    };
    let alpha = MARKER_ALPHA + f64::from(a) / 255.0 * (1.0 - MARKER_ALPHA);
    Rgba([
        mix(r, MARKER_COLOR[0]),
        mix(g, MARKER_COLOR[1]),
        mix(b, MARKER_COLOR[2]),
        (alpha * 255.0).round() as u8,
    ])
}

/// Encode as PNG and wrap in a `data:` URL.
pub fn png_data_url(image: RgbaImage) -> Result<String> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(&buf)))
}

/// Grab the current frame, mark the click and encode it for upload.
pub fn capture_with_marker(source: &mut dyn FrameSource, point: ClickPoint) -> Result<String> {
    let frame = source.current_frame()?;
    png_data_url(mark_frame(frame.as_ref(), point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_stays_inside_video() {
        let video = Size {
            width: 640.0,
            height: 360.0,
        };
        let tip = Size {
            width: 160.0,
            height: 44.0,
        };
        assert_eq!(place_tooltip(ClickPoint::new(0.1, 0.1), video, tip), (76.0, 48.0));
        assert_eq!(place_tooltip(ClickPoint::new(1.0, 1.0), video, tip), (476.0, 312.0));

        let tiny = Size {
            width: 100.0,
            height: 30.0,
        };
        assert_eq!(place_tooltip(ClickPoint::new(0.9, 0.9), tiny, tip), (4.0, 4.0));

        for i in 0..=10 {
            let p = ClickPoint::new(i as f64 / 10.0, 1.0 - i as f64 / 10.0);
            let (x, y) = place_tooltip(p, video, Size { width: 0.0, height: 0.0 });
            assert!(x >= 4.0 && x + 160.0 <= 636.0);
            assert!(y >= 4.0 && y + 44.0 <= 356.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlays_expire() {
        let now = Instant::now();
        let tip = Overlay::tooltip(ClickPoint::default(), now);
        assert!(tip.is_visible(now + Duration::from_millis(4999)));
        assert!(!tip.is_visible(now + Duration::from_secs(5)));

        let marker = Overlay::annotation(ClickPoint::default(), now);
        assert!(marker.is_visible(now + Duration::from_secs(8)));
        assert!(!marker.is_visible(now + Duration::from_millis(8400)));
    }

    #[test]
    fn marker_is_drawn_at_click() {
        let frame = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255])));
        let marked = mark_frame(Some(&frame), ClickPoint::new(0.25, 0.5));

        // radius = 15px around (50, 50)
        assert_eq!(marked.get_pixel(50, 50).0, [128, 0, 128, 255]);
        assert_eq!(marked.get_pixel(60, 50).0, [128, 0, 128, 255]);
        assert_eq!(marked.get_pixel(70, 50).0, [0, 0, 255, 255]);
        assert_eq!(marked.get_pixel(150, 50).0, [0, 0, 255, 255]);
    }

    #[test]
    fn missing_frame_uses_fallback_canvas() {
        let marked = mark_frame(None, ClickPoint::new(1.0, 1.0));
        assert_eq!((marked.width(), marked.height()), (FALLBACK_WIDTH, FALLBACK_HEIGHT));
        assert_eq!(marked.get_pixel(1279, 719).0, [128, 0, 0, 128]);
    }

    #[test]
    fn data_url_round_trips_through_png() {
        let mut source = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let url = capture_with_marker(&mut source, ClickPoint::default()).unwrap();
        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(payload).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }
}
