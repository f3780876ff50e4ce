//! Headless autoplay: drives a session from a simulated audio clock and
//! presses every note with a fixed timing error.

use crate::game::chart::Chart;
use crate::game::gameplay::{self, SessionConfig, SongClock, TickInput};
use crate::game::note::LANE_COUNT;
use crate::game::stage_stats::JudgementSummary;
use log::debug;
use std::collections::VecDeque;
use std::sync::Arc;

/// Audio keeps playing this long past the last note.
const AUDIO_TAIL_SECONDS: f64 = 2.0;

pub const MIN_FRAME_RATE: f64 = 1.0;
pub const MAX_FRAME_RATE: f64 = 10_000.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoplayOptions {
    /// Press error magnitude; alternates late/early note by note.
    pub error_seconds: f64,
    pub frame_rate: f64,
}

impl Default for AutoplayOptions {
    fn default() -> Self {
        Self { error_seconds: 0.0, frame_rate: 240.0 }
    }
}

impl AutoplayOptions {
    /// Tick rate actually simulated: clamped to the supported range, with
    /// non-finite rates replaced by the default.
    pub fn effective_frame_rate(&self) -> f64 {
        if self.frame_rate.is_finite() {
            self.frame_rate.clamp(MIN_FRAME_RATE, MAX_FRAME_RATE)
        } else {
            Self::default().frame_rate
        }
    }
}

/// Pre-computed press times per lane.
pub struct AutoplayProcessor {
    presses: [VecDeque<f64>; LANE_COUNT],
}

impl AutoplayProcessor {
    pub fn new(chart: &Chart, error_seconds: f64) -> Self {
        let mut per_lane: [Vec<f64>; LANE_COUNT] = std::array::from_fn(|_| Vec::new());
        for (i, note) in chart.notes().iter().enumerate() {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            per_lane[note.lane.index()].push(chart.beat_to_seconds(note.beat) + sign * error_seconds);
        }
        let presses = per_lane.map(|mut times| {
            times.sort_by(f64::total_cmp);
            VecDeque::from(times)
        });
        Self { presses }
    }

    /// Press edges for a tick at `song_time`: at most one per lane.
    pub fn poll(&mut self, song_time: f64) -> [bool; LANE_COUNT] {
        std::array::from_fn(|lane| {
            let queue = &mut self.presses[lane];
            if queue.front().is_some_and(|t| *t <= song_time) {
                queue.pop_front();
                true
            } else {
                false
            }
        })
    }

    pub fn remaining(&self) -> usize {
        self.presses.iter().map(VecDeque::len).sum()
    }
}

/// Plays `chart` to completion and returns the session summary.
pub fn run(chart: Arc<Chart>, config: SessionConfig, options: AutoplayOptions) -> Arc<JudgementSummary> {
    let frame = 1.0 / options.effective_frame_rate();
    let clock = SongClock::start(0.0, &chart, config.output_latency_seconds);
    let last_note_time = chart
        .notes()
        .last()
        .map_or(0.0, |n| chart.beat_to_seconds(n.beat));
    let audio_end = last_note_time + AUDIO_TAIL_SECONDS;
    let mut processor = AutoplayProcessor::new(&chart, options.error_seconds);
    let mut state = gameplay::init(chart, config);

    let mut tick: u64 = 0;
    loop {
        let now = tick as f64 * frame;
        tick += 1;
        if !clock.has_started(now) {
            continue;
        }

        let song_time = clock.song_time(now);
        let input = TickInput {
            song_time,
            pressed: processor.poll(song_time),
            audio_playing: song_time < audio_end,
        };
        let out = gameplay::update(&mut state, &input);
        if out.finished {
            debug!("Autoplay finished after {tick} ticks at song time {song_time:.3}");
            break;
        }
    }

    gameplay::finish(&mut state, false)
}

#[cfg(test)]
mod tests {
    use super::{AutoplayOptions, AutoplayProcessor, MAX_FRAME_RATE, MIN_FRAME_RATE, run};
    use crate::game::chart::Chart;
    use crate::game::gameplay::SessionConfig;
    use crate::game::judgment::Judgement;
    use crate::game::note::{Lane, Note};
    use crate::game::scores::Grade;
    use std::sync::Arc;

    fn chart() -> Arc<Chart> {
        let notes = (0..8).map(|i| Note::new(f64::from(i), Lane::ALL[i as usize % 4])).collect();
        Arc::new(Chart::new("song.ogg".to_string(), 120, 0.0, notes, Vec::new()).expect("valid chart"))
    }

    #[test]
    fn presses_alternate_late_and_early() {
        let mut p = AutoplayProcessor::new(&chart(), 0.01);
        assert_eq!(p.remaining(), 8);
        assert_eq!(p.poll(0.0), [false; 4]);
        assert_eq!(p.poll(0.01), [true, false, false, false]);
        // Second note at 0.5s is pressed 10ms early.
        assert_eq!(p.poll(0.495), [false, true, false, false]);
        assert_eq!(p.remaining(), 6);
    }

    #[test]
    fn exact_autoplay_is_all_marvelous() {
        let summary = run(chart(), SessionConfig::default(), AutoplayOptions { error_seconds: 0.0, frame_rate: 200.0 });
        assert_eq!(summary.count(Judgement::Marvelous), 8);
        assert_eq!(summary.max_combo, 8);
        assert_eq!(summary.score, 1_000_000);
        assert_eq!(summary.grade, Grade::AAA);
    }

    #[test]
    fn large_error_grades_lower() {
        let summary = run(chart(), SessionConfig::default(), AutoplayOptions { error_seconds: 0.05, frame_rate: 1000.0 });
        assert_eq!(summary.miss_count, 0);
        assert!(summary.count(Judgement::Great) + summary.count(Judgement::Good) == 8);
        assert!(summary.score < 1_000_000);
    }

    #[test]
    fn errors_beyond_the_miss_window_miss_everything() {
        let summary = run(chart(), SessionConfig::default(), AutoplayOptions { error_seconds: 0.5, frame_rate: 120.0 });
        assert_eq!(summary.miss_count, 8);
        assert!(summary.failed);
        assert_eq!(summary.grade, Grade::E);
    }

    #[test]
    fn frame_rate_is_kept_in_range() {
        let with_rate = |frame_rate| AutoplayOptions { error_seconds: 0.0, frame_rate };
        assert_eq!(with_rate(120.0).effective_frame_rate(), 120.0);
        assert_eq!(with_rate(0.0).effective_frame_rate(), MIN_FRAME_RATE);
        assert_eq!(with_rate(1e12).effective_frame_rate(), MAX_FRAME_RATE);
        assert_eq!(with_rate(f64::INFINITY).effective_frame_rate(), 240.0);
        assert_eq!(with_rate(f64::NAN).effective_frame_rate(), 240.0);
    }

    #[test]
    fn unbounded_frame_rates_still_finish() {
        for frame_rate in [f64::INFINITY, f64::NAN, 1e12] {
            let summary = run(chart(), SessionConfig::default(), AutoplayOptions { error_seconds: 0.0, frame_rate });
            assert_eq!(summary.count(Judgement::Marvelous), 8);
        }
    }
}
