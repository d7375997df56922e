use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{coords::ZoomBounds, track::DEFAULT_MIN_CLIP_DURATION, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timeline: TimelineConfig,
    pub playback: PlaybackConfig,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Timeline editing behaviour and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Frame rate used for frame stepping and timecode display.
    pub fps: f64,
    /// Shortest clip a resize can produce, in seconds.
    pub min_clip_duration: f64,
    /// Distance from a clip edge, in pixels, that grabs the edge for resizing.
    pub edge_hit_zone_px: f64,
    pub keyframe_hit_radius_px: f64,
    pub playhead_hit_zone_px: f64,
    pub default_pixels_per_second: f64,
    pub min_pixels_per_second: f64,
    pub max_pixels_per_second: f64,
    /// Zoom multiplier per wheel notch.
    pub zoom_step: f64,
    /// Scroll distance per wheel notch.
    pub pan_step_px: f64,
    pub snap_enabled: bool,
    /// Grid spacing for snapping, in seconds.
    pub snap_interval: f64,
    /// Distance covered by the jump keys, in seconds.
    pub jump_seconds: f64,
    /// Offset applied to duplicated keyframes, in seconds.
    pub duplicate_offset: f64,
    pub ruler_height_px: f64,
    pub lane_height_px: f64,
    pub view_width_px: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            min_clip_duration: DEFAULT_MIN_CLIP_DURATION,
            edge_hit_zone_px: 6.0,
            keyframe_hit_radius_px: 6.0,
            playhead_hit_zone_px: 4.0,
            default_pixels_per_second: 100.0,
            min_pixels_per_second: 10.0,
            max_pixels_per_second: 1000.0,
            zoom_step: 1.1,
            pan_step_px: 40.0,
            snap_enabled: true,
            snap_interval: 0.5,
            jump_seconds: 5.0,
            duplicate_offset: 1.0,
            ruler_height_px: 24.0,
            lane_height_px: 32.0,
            view_width_px: 1000.0,
        }
    }
}

impl TimelineConfig {
    pub fn zoom_bounds(&self) -> ZoomBounds {
        ZoomBounds {
            min_pixels_per_second: self.min_pixels_per_second,
            max_pixels_per_second: self.max_pixels_per_second.max(self.min_pixels_per_second),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Timeline length used while no usable audio track is loaded.
    pub duration_seconds: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 60.0,
        }
    }
}

/// Configuration of the offline band analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub sample_rate: u32,
    pub block_size: usize,
    /// Upper edge of the bass band in Hz.
    pub bass_max_hz: f64,
    /// Upper edge of the mid band in Hz. Everything above is high.
    pub mid_max_hz: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_size: 1024,
            bass_max_hz: 250.0,
            mid_max_hz: 4_000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fill_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"timeline": {"fps": 60.0}, "analysis": {"block_size": 2048}}"#)
                .unwrap();
        assert_eq!(config.timeline.fps, 60.0);
        assert_eq!(config.timeline.snap_interval, 0.5);
        assert_eq!(config.analysis.block_size, 2048);
        assert_eq!(config.analysis.sample_rate, 48_000);
        assert_eq!(config.playback, PlaybackConfig::default());
    }

    #[test]
    fn zoom_bounds_never_invert() {
        let config = TimelineConfig {
            min_pixels_per_second: 50.0,
            max_pixels_per_second: 20.0,
            ..TimelineConfig::default()
        };
        let bounds = config.zoom_bounds();
        assert!(bounds.max_pixels_per_second >= bounds.min_pixels_per_second);
    }
}
