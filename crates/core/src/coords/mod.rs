//! Conversions between timeline seconds and on-screen pixels.
//!
//! Pixel positions are measured from the left edge of the scrolled content,
//! so `time_to_pixels(0.0, pps) == 0.0`. Screen-space positions subtract the
//! [`Viewport`] scroll offset on top of that.

use serde::{Deserialize, Serialize};

/// Converts seconds to content pixels at `pixels_per_second`.
pub fn time_to_pixels(seconds: f64, pixels_per_second: f64) -> f64 {
    seconds * pixels_per_second
}

/// Converts content pixels to seconds. A non-positive scale maps everything
/// to zero instead of producing infinities.
pub fn pixels_to_time(pixels: f64, pixels_per_second: f64) -> f64 {
    if pixels_per_second > 0.0 {
        pixels / pixels_per_second
    } else {
        0.0
    }
}

/// Rounds `seconds` to the nearest frame boundary at `fps`.
pub fn quantize_to_frame(seconds: f64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return seconds;
    }
    (seconds * fps).round() / fps
}

/// Rounds `seconds` to the nearest multiple of `interval`.
pub fn snap_to_grid(seconds: f64, interval: f64) -> f64 {
    if interval <= 0.0 {
        return seconds;
    }
    (seconds / interval).round() * interval
}

/// Formats `seconds` as `MM:SS:FF` at the given frame rate.
pub fn format_timecode(seconds: f64, fps: f64) -> String {
    let fps = fps.max(1.0);
    let total_frames = (seconds.max(0.0) * fps).round() as u64;
    let frames_per_second = fps.round() as u64;
    let frames = total_frames % frames_per_second;
    let total_seconds = total_frames / frames_per_second;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 60,
        total_seconds % 60,
        frames
    )
}

/// Horizontal zoom limits in pixels per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomBounds {
    pub min_pixels_per_second: f64,
    pub max_pixels_per_second: f64,
}

impl ZoomBounds {
    pub fn clamp(&self, pixels_per_second: f64) -> f64 {
        pixels_per_second.clamp(self.min_pixels_per_second, self.max_pixels_per_second)
    }
}

impl Default for ZoomBounds {
    fn default() -> Self {
        Self {
            min_pixels_per_second: 10.0,
            max_pixels_per_second: 1000.0,
        }
    }
}

/// The visible window onto the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pixels_per_second: f64,
    /// Horizontal scroll offset in content pixels.
    pub scroll_px: f64,
    /// Width of the track area on screen.
    pub width_px: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pixels_per_second: 100.0,
            scroll_px: 0.0,
            width_px: 1000.0,
        }
    }
}

impl Viewport {
    pub fn new(pixels_per_second: f64, width_px: f64) -> Self {
        Self {
            pixels_per_second,
            scroll_px: 0.0,
            width_px,
        }
    }

    /// Time under the screen-space x coordinate.
    pub fn time_at(&self, screen_x: f64) -> f64 {
        pixels_to_time(screen_x + self.scroll_px, self.pixels_per_second)
    }

    /// Screen-space x coordinate of `seconds`.
    pub fn x_at(&self, seconds: f64) -> f64 {
        time_to_pixels(seconds, self.pixels_per_second) - self.scroll_px
    }

    /// Converts a pointer delta in pixels to a time delta.
    pub fn delta_time(&self, delta_px: f64) -> f64 {
        pixels_to_time(delta_px, self.pixels_per_second)
    }

    /// Seconds spanned by one screen pixel.
    pub fn seconds_per_pixel(&self) -> f64 {
        pixels_to_time(1.0, self.pixels_per_second)
    }

    /// The `(start, end)` time range currently on screen.
    pub fn visible_range(&self) -> (f64, f64) {
        (self.time_at(0.0), self.time_at(self.width_px))
    }

    /// Scrolls so the content pixel `scroll_px` sits at the left edge, keeping
    /// the view inside `[0, content_duration]` where possible.
    pub fn set_scroll(&mut self, scroll_px: f64, content_duration: f64) {
        let content_px = time_to_pixels(content_duration, self.pixels_per_second);
        let max_scroll = (content_px - self.width_px).max(0.0);
        self.scroll_px = scroll_px.clamp(0.0, max_scroll);
    }

    /// Scrolls horizontally by `delta_px` screen pixels.
    pub fn pan_by(&mut self, delta_px: f64, content_duration: f64) {
        self.set_scroll(self.scroll_px + delta_px, content_duration);
    }

    /// Changes the zoom by `factor` while keeping the time under `pointer_x`
    /// fixed on screen.
    ///
    /// The scroll offset is left unclamped, so zooming out near the start may
    /// briefly expose time before zero; the next pan clamps it back.
    pub fn zoom_about(&mut self, pointer_x: f64, factor: f64, bounds: ZoomBounds) {
        if !(factor > 0.0) || !factor.is_finite() {
            return;
        }
        let anchor_time = self.time_at(pointer_x);
        self.pixels_per_second = bounds.clamp(self.pixels_per_second * factor);
        self.scroll_px = time_to_pixels(anchor_time, self.pixels_per_second) - pointer_x;
    }

    /// Adjusts the scroll so `seconds` is on screen, moving as little as
    /// possible.
    pub fn scroll_to_reveal(&mut self, seconds: f64, content_duration: f64) {
        let x = self.x_at(seconds);
        if x < 0.0 {
            self.set_scroll(self.scroll_px + x, content_duration);
        } else if x > self.width_px {
            self.set_scroll(self.scroll_px + (x - self.width_px), content_duration);
        }
    }
}
