use std::{cmp::Ordering, collections::BTreeMap, f64::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex64, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{
    audio::{BandSnapshot, SignalFrame},
    config::AnalysisConfig,
    EditorError, Result,
};

/// Band energies of one analysis block, stamped with the block's centre time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandFrame {
    pub time: f64,
    #[serde(flatten)]
    pub bands: BandSnapshot,
}

/// Reduces blocks of mono PCM to bass/mid/high energies.
///
/// Each band is the summed FFT magnitude over its bin range, scaled so that a
/// full-scale sine inside the band reads close to `1.0`, then clamped to
/// `[0, 1]`.
pub struct BandAnalyzer {
    sample_rate: u32,
    bass_max_hz: f64,
    mid_max_hz: f64,
    fft_planner: RealFftPlanner<f64>,
    fft: Option<FftResources>,
}

impl BandAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            sample_rate: config.sample_rate.max(1),
            bass_max_hz: config.bass_max_hz,
            mid_max_hz: config.mid_max_hz.max(config.bass_max_hz),
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn process_block(&mut self, samples: &[f32]) -> Result<BandSnapshot> {
        if samples.len() < 2 {
            return Err(EditorError::InvalidInput(
                "analysis requires blocks with at least two samples",
            ));
        }

        let len = samples.len();
        let bin_hz = self.sample_rate as f64 / len as f64;
        let bass_max_hz = self.bass_max_hz;
        let mid_max_hz = self.mid_max_hz;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value as f64 * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
            .map_err(|err| EditorError::msg(format!("fft failed: {err}")))?;

        let mut sums = [0.0f64; 3];
        // Skip the DC bin.
        for (i, bin) in fft.spectrum.iter().enumerate().skip(1) {
            let hz = i as f64 * bin_hz;
            let slot = if hz < bass_max_hz {
                0
            } else if hz < mid_max_hz {
                1
            } else {
                2
            };
            sums[slot] += bin.norm();
        }

        let full_scale = len as f64 / 2.0;
        let normalise = |sum: f64| (sum / full_scale).clamp(0.0, 1.0);
        Ok(BandSnapshot::new(
            normalise(sums[0]),
            normalise(sums[1]),
            normalise(sums[2]),
        ))
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        if self.fft.as_ref().map_or(true, |fft| fft.size != size) {
            self.fft = None;
        }
        let planner = &mut self.fft_planner;
        self.fft
            .get_or_insert_with(|| FftResources::plan(planner, size))
    }
}

impl fmt::Debug for BandAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("bass_max_hz", &self.bass_max_hz)
            .field("mid_max_hz", &self.mid_max_hz)
            .field("fft", &self.fft)
            .finish()
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f64>>,
    scratch: Vec<Complex64>,
    spectrum: Vec<Complex64>,
    input: Vec<f64>,
}

impl FftResources {
    fn plan(planner: &mut RealFftPlanner<f64>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn hann_value(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f64) / (len as f64 - 1.0)).cos()
}

/// Splits a mono buffer into consecutive blocks and analyses each one. A
/// trailing partial block is zero-padded.
pub fn analyse_buffer(samples: &[f32], config: &AnalysisConfig) -> Result<BandTimeline> {
    let block_size = config.block_size.max(2);
    let mut analyzer = BandAnalyzer::new(config);
    let sample_rate = analyzer.sample_rate() as f64;
    let mut frames = Vec::with_capacity(samples.len() / block_size + 1);
    let mut padded = vec![0.0f32; block_size];

    for (index, chunk) in samples.chunks(block_size).enumerate() {
        let block = if chunk.len() == block_size {
            chunk
        } else {
            padded[..chunk.len()].copy_from_slice(chunk);
            padded[chunk.len()..].fill(0.0);
            &padded[..]
        };
        let bands = analyzer.process_block(block)?;
        let start = (index * block_size) as f64 / sample_rate;
        frames.push(BandFrame {
            time: start + block_size as f64 / sample_rate * 0.5,
            bands,
        });
    }

    Ok(BandTimeline::new(frames))
}

/// Time series of band energies for one audio track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandTimeline {
    frames: Vec<BandFrame>,
}

impl BandTimeline {
    pub fn new(mut frames: Vec<BandFrame>) -> Self {
        frames.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { frames }
    }

    pub fn frames(&self) -> &[BandFrame] {
        &self.frames
    }

    /// Energies of the latest frame at or before `time`. Silence before the
    /// first frame.
    pub fn sample_at(&self, time: f64) -> BandSnapshot {
        match self
            .frames
            .binary_search_by(|frame| frame.time.partial_cmp(&time).unwrap_or(Ordering::Equal))
        {
            Ok(index) => self.frames[index].bands,
            Err(0) => BandSnapshot::default(),
            Err(index) => self.frames[index - 1].bands,
        }
    }
}

/// Recorded analyses for several audio tracks, replayed by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordedSignals {
    pub tracks: BTreeMap<String, BandTimeline>,
}

impl RecordedSignals {
    pub fn insert(&mut self, track_id: impl Into<String>, timeline: BandTimeline) {
        self.tracks.insert(track_id.into(), timeline);
    }

    /// Snapshot of every recorded track at `time`.
    pub fn frame_at(&self, time: f64) -> SignalFrame {
        SignalFrame {
            bands: self
                .tracks
                .iter()
                .map(|(id, timeline)| (id.clone(), timeline.sample_at(time)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            sample_rate: 16_000,
            block_size: 1024,
            ..AnalysisConfig::default()
        }
    }

    fn sine(frequency: f64, len: usize, sample_rate: f64) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    #[test]
    fn silence_has_no_energy() {
        let mut analyzer = BandAnalyzer::new(&config());
        let bands = analyzer.process_block(&[0.0; 1024]).unwrap();
        assert_eq!(bands, BandSnapshot::default());
    }

    #[test]
    fn low_tone_lands_in_bass() {
        let mut analyzer = BandAnalyzer::new(&config());
        let bands = analyzer.process_block(&sine(125.0, 1024, 16_000.0)).unwrap();
        assert!(bands.bass > 0.5, "{bands:?}");
        assert!(bands.mid < 0.1, "{bands:?}");
        assert!(bands.high < 0.1, "{bands:?}");
    }

    #[test]
    fn high_tone_lands_in_high() {
        let mut analyzer = BandAnalyzer::new(&config());
        let bands = analyzer.process_block(&sine(6_000.0, 1024, 16_000.0)).unwrap();
        assert!(bands.high > bands.bass);
        assert!(bands.high > bands.mid);
    }

    #[test]
    fn rejects_tiny_blocks() {
        let mut analyzer = BandAnalyzer::new(&config());
        assert!(analyzer.process_block(&[0.5]).is_err());
    }

    #[test]
    fn buffer_analysis_stamps_block_centres() {
        let samples = sine(125.0, 1024 * 3 + 100, 16_000.0);
        let timeline = analyse_buffer(&samples, &config()).unwrap();
        assert_eq!(timeline.frames().len(), 4);
        assert!((timeline.frames()[0].time - 0.032).abs() < 1e-9);
    }

    #[test]
    fn sampling_holds_previous_frame() {
        let timeline = BandTimeline::new(vec![
            BandFrame {
                time: 0.5,
                bands: BandSnapshot::new(0.2, 0.0, 0.0),
            },
            BandFrame {
                time: 1.0,
                bands: BandSnapshot::new(0.8, 0.0, 0.0),
            },
        ]);
        assert_eq!(timeline.sample_at(0.1), BandSnapshot::default());
        assert_eq!(timeline.sample_at(0.75).bass, 0.2);
        assert_eq!(timeline.sample_at(1.0).bass, 0.8);
        assert_eq!(timeline.sample_at(9.0).bass, 0.8);
    }
}
