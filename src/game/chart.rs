use crate::game::note::Note;
use crate::game::parsing::FormatError;
use std::cmp::Ordering;

pub const MAX_SUPPORTED_BPM: i32 = 1000;
pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoChange {
    pub beat: f64,
    pub bpm: f64,
}

impl TempoChange {
    #[inline(always)]
    pub const fn new(beat: f64, bpm: f64) -> Self {
        Self { beat, bpm }
    }
}

/// A parsed, playable chart. Built once per load and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Chart {
    music_file: String,
    base_bpm: i32,
    /// Timeline origin shift in seconds; the negated `#OFFSET` value.
    offset_seconds: f64,
    notes: Vec<Note>,
    tempo_segments: Vec<TempoChange>,
}

impl Chart {
    /// Builds a chart, normalizing tempo data so the timeline is fully
    /// defined from beat 0:
    /// - an empty tempo list becomes a single 120 BPM segment,
    /// - segments are sorted by beat,
    /// - a beat-0 segment carrying the first bpm is synthesized if missing.
    ///
    /// Notes are stably sorted by beat.
    pub fn new(
        music_file: String,
        base_bpm: i32,
        offset_seconds: f64,
        mut notes: Vec<Note>,
        mut tempo_segments: Vec<TempoChange>,
    ) -> Result<Self, FormatError> {
        if base_bpm <= 0 || base_bpm > MAX_SUPPORTED_BPM {
            return Err(FormatError::InvalidBpm { bpm: base_bpm });
        }

        tempo_segments.retain(|seg| seg.bpm > 0.0 && seg.bpm.is_finite() && seg.beat.is_finite());
        normalize_tempo_segments(&mut tempo_segments);
        notes.sort_by(|a, b| a.beat.partial_cmp(&b.beat).unwrap_or(Ordering::Equal));

        Ok(Self { music_file, base_bpm, offset_seconds, notes, tempo_segments })
    }

    #[inline(always)]
    pub fn music_file(&self) -> &str {
        &self.music_file
    }

    #[inline(always)]
    pub const fn base_bpm(&self) -> i32 {
        self.base_bpm
    }

    #[inline(always)]
    pub const fn offset_seconds(&self) -> f64 {
        self.offset_seconds
    }

    #[inline(always)]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[inline(always)]
    pub fn tempo_segments(&self) -> &[TempoChange] {
        &self.tempo_segments
    }

    /// Seconds elapsed from beat 0 to `beat`, integrating each tempo segment
    /// at its own constant rate.
    pub fn beat_to_seconds(&self, beat: f64) -> f64 {
        let segments = &self.tempo_segments;
        if segments.is_empty() {
            return beat * 0.5;
        }

        let mut seconds = 0.0;
        for (i, current) in segments.iter().enumerate() {
            let next_beat = segments.get(i + 1).map_or(beat, |next| next.beat);
            if beat <= current.beat {
                break;
            }

            let segment_end = beat.min(next_beat);
            if segment_end > current.beat {
                seconds += (segment_end - current.beat) * 60.0 / current.bpm;
            }

            if beat <= next_beat {
                break;
            }
        }
        seconds
    }

    /// Inverse of [`Chart::beat_to_seconds`]. Times before zero extrapolate
    /// backwards at the first segment's tempo.
    pub fn seconds_to_beat(&self, seconds: f64) -> f64 {
        let segments = &self.tempo_segments;
        let Some(first) = segments.first() else {
            return seconds * 2.0;
        };
        if seconds <= 0.0 {
            return first.beat + seconds * first.bpm / 60.0;
        }

        let mut elapsed = 0.0;
        for (i, current) in segments.iter().enumerate() {
            let Some(next) = segments.get(i + 1) else {
                return current.beat + (seconds - elapsed) * current.bpm / 60.0;
            };
            let length = (next.beat - current.beat) * 60.0 / current.bpm;
            if seconds <= elapsed + length {
                return current.beat + (seconds - elapsed) * current.bpm / 60.0;
            }
            elapsed += length;
        }
        // Unreachable with a non-empty list; the last segment returns above.
        first.beat
    }

    /// Bpm of the last segment starting at or before `beat`, falling back to
    /// the base bpm when that would be non-positive.
    pub fn bpm_at_beat(&self, beat: f64) -> f64 {
        let Some(first) = self.tempo_segments.first() else {
            return f64::from(self.base_bpm);
        };

        let mut current_bpm = first.bpm;
        for seg in &self.tempo_segments {
            if seg.beat > beat {
                break;
            }
            current_bpm = seg.bpm;
        }

        if current_bpm > 0.0 { current_bpm } else { f64::from(self.base_bpm) }
    }
}

/// Sorts tempo changes and pins the one in effect at beat 0 to the origin.
pub fn normalize_tempo_segments(segments: &mut Vec<TempoChange>) {
    if segments.is_empty() {
        segments.push(TempoChange::new(0.0, DEFAULT_BPM));
    }
    segments.sort_by(|a, b| a.beat.partial_cmp(&b.beat).unwrap_or(Ordering::Equal));

    // The change in effect at beat 0 is the last one at or before it; earlier
    // ones only shape time before the origin.
    let in_effect = segments.iter().rposition(|seg| seg.beat <= 0.0);
    match in_effect {
        Some(idx) => {
            segments.drain(..idx);
            segments[0].beat = 0.0;
        }
        None => {
            let bpm = segments[0].bpm;
            segments.insert(0, TempoChange::new(0.0, bpm));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Chart, TempoChange};
    use crate::game::note::{Lane, Note};
    use crate::game::parsing::FormatError;

    fn chart_with(tempo: Vec<TempoChange>) -> Chart {
        Chart::new("song.ogg".to_string(), 120, 0.0, Vec::new(), tempo).expect("valid chart")
    }

    #[test]
    fn default_tempo_is_half_second_per_beat() {
        let chart = chart_with(Vec::new());
        assert_eq!(chart.tempo_segments(), &[TempoChange::new(0.0, 120.0)]);
        for beat in [0.0, 0.25, 1.0, 7.5, 64.0] {
            assert!((chart.beat_to_seconds(beat) - beat * 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn single_change_is_linear() {
        let chart = chart_with(vec![TempoChange::new(0.0, 150.0)]);
        let per_beat = 60.0 / 150.0;
        for beat in [1.0, 2.0, 10.0, 33.3] {
            assert!((chart.beat_to_seconds(beat) - beat * per_beat).abs() < 1e-9);
        }
    }

    #[test]
    fn unsorted_changes_are_sorted_and_anchored_at_zero() {
        let chart = chart_with(vec![TempoChange::new(8.0, 240.0), TempoChange::new(4.0, 60.0)]);
        assert_eq!(
            chart.tempo_segments(),
            &[TempoChange::new(0.0, 60.0), TempoChange::new(4.0, 60.0), TempoChange::new(8.0, 240.0)]
        );
        // 8 beats at 60 bpm then 4 beats at 240 bpm.
        assert!((chart.beat_to_seconds(12.0) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn negative_beat_changes_collapse_onto_the_origin() {
        let chart = chart_with(vec![
            TempoChange::new(-2.0, 100.0),
            TempoChange::new(-1.0, 150.0),
            TempoChange::new(4.0, 60.0),
        ]);
        assert_eq!(
            chart.tempo_segments(),
            &[TempoChange::new(0.0, 150.0), TempoChange::new(4.0, 60.0)]
        );
        assert_eq!(chart.beat_to_seconds(0.0), 0.0);
    }

    #[test]
    fn piecewise_tempo_accumulates_per_segment() {
        let chart = chart_with(vec![TempoChange::new(0.0, 120.0), TempoChange::new(4.0, 60.0)]);
        assert!((chart.beat_to_seconds(4.0) - 2.0).abs() < 1e-9);
        assert!((chart.beat_to_seconds(5.0) - 3.0).abs() < 1e-9);
        assert!((chart.beat_to_seconds(2.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn beat_to_seconds_is_monotonic() {
        let chart = chart_with(vec![
            TempoChange::new(0.0, 90.0),
            TempoChange::new(3.0, 300.0),
            TempoChange::new(5.5, 45.0),
        ]);
        let mut last = chart.beat_to_seconds(0.0);
        let mut beat = 0.0;
        while beat < 20.0 {
            beat += 0.125;
            let now = chart.beat_to_seconds(beat);
            assert!(now >= last, "time went backwards at beat {beat}");
            last = now;
        }
    }

    #[test]
    fn seconds_to_beat_inverts_the_timeline() {
        let chart = chart_with(vec![TempoChange::new(0.0, 120.0), TempoChange::new(4.0, 60.0)]);
        for beat in [0.0, 1.0, 4.0, 4.5, 9.0] {
            let secs = chart.beat_to_seconds(beat);
            assert!((chart.seconds_to_beat(secs) - beat).abs() < 1e-9);
        }
        assert!((chart.seconds_to_beat(-1.0) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn bpm_lookup_uses_last_change_at_or_before_beat() {
        let chart = chart_with(vec![TempoChange::new(0.0, 120.0), TempoChange::new(4.0, 200.0)]);
        assert_eq!(chart.bpm_at_beat(0.0), 120.0);
        assert_eq!(chart.bpm_at_beat(3.99), 120.0);
        assert_eq!(chart.bpm_at_beat(4.0), 200.0);
        assert_eq!(chart.bpm_at_beat(100.0), 200.0);
    }

    #[test]
    fn base_bpm_must_be_in_range() {
        for bpm in [0, -5, 1001] {
            let err = Chart::new(String::new(), bpm, 0.0, Vec::new(), Vec::new()).unwrap_err();
            assert_eq!(err, FormatError::InvalidBpm { bpm });
        }
        assert!(Chart::new(String::new(), 1000, 0.0, Vec::new(), Vec::new()).is_ok());
    }

    #[test]
    fn notes_are_stably_sorted_by_beat() {
        let notes = vec![
            Note::new(2.0, Lane::Up),
            Note::new(1.0, Lane::Right),
            Note::new(1.0, Lane::Left),
        ];
        let chart = Chart::new(String::new(), 120, 0.0, notes, Vec::new()).expect("valid chart");
        let lanes: Vec<Lane> = chart.notes().iter().map(|n| n.lane).collect();
        assert_eq!(lanes, vec![Lane::Right, Lane::Left, Lane::Up]);
    }
}
