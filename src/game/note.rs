use serde::Serialize;

pub const LANE_COUNT: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Lane {
    Left = 0,
    Down = 1,
    Up = 2,
    Right = 3,
}

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Left, Lane::Down, Lane::Up, Lane::Right];

    #[inline(always)]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Lane::Left),
            1 => Some(Lane::Down),
            2 => Some(Lane::Up),
            3 => Some(Lane::Right),
            _ => None,
        }
    }
}

/// A single tap onset in a chart. Identity is positional: two notes on the
/// same beat and lane are still two notes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Note {
    pub beat: f64,
    pub lane: Lane,
}

impl Note {
    #[inline(always)]
    pub const fn new(beat: f64, lane: Lane) -> Self {
        Self { beat, lane }
    }
}

/// A note that has been dispatched into its lane queue. The absolute time is
/// resolved once at spawn and never recomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiveNote {
    /// Index of the source note in the chart's note list.
    pub note_index: usize,
    pub beat: f64,
    pub lane: Lane,
    pub time_sec: f64,
    /// Tempo-scaled lead time this note was spawned with.
    pub travel_sec: f64,
}

impl LiveNote {
    /// Travel progress toward the judge line: 0.0 at spawn, 1.0 on time, and
    /// past 1.0 once late.
    #[inline(always)]
    pub fn progress(&self, song_time: f64) -> f64 {
        if self.travel_sec <= 0.0 {
            return 1.0;
        }
        1.0 - (self.time_sec - song_time) / self.travel_sec
    }
}

#[cfg(test)]
mod tests {
    use super::{Lane, LiveNote};

    #[test]
    fn lane_index_round_trips() {
        for lane in Lane::ALL {
            assert_eq!(Lane::from_index(lane.index()), Some(lane));
        }
        assert_eq!(Lane::from_index(4), None);
    }

    #[test]
    fn progress_runs_from_spawn_to_judge_line() {
        let live = LiveNote { note_index: 0, beat: 4.0, lane: Lane::Up, time_sec: 2.0, travel_sec: 1.0 };
        assert!((live.progress(1.0) - 0.0).abs() < 1e-9);
        assert!((live.progress(1.5) - 0.5).abs() < 1e-9);
        assert!((live.progress(2.0) - 1.0).abs() < 1e-9);
        assert!(live.progress(2.5) > 1.0);
    }
}
