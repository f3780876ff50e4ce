// Judgement windows, in seconds, as absolute distance from the note time.
// Stored as f32 and widened when compared against f64 offsets, so each
// boundary sits a hair under its decimal value.

pub const MARVELOUS_WINDOW_S: f32 = 0.015;
pub const PERFECT_WINDOW_S: f32 = 0.030;
pub const GREAT_WINDOW_S: f32 = 0.060;
pub const GOOD_WINDOW_S: f32 = 0.100;
pub const MISS_WINDOW_S: f32 = 0.200;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimingWindows {
    pub marvelous: f32,
    pub perfect: f32,
    pub great: f32,
    pub good: f32,
    /// Outer edge of the `Bad` tier and the expiry threshold for unhit notes.
    pub miss: f32,
}

impl Default for TimingWindows {
    fn default() -> Self {
        Self {
            marvelous: MARVELOUS_WINDOW_S,
            perfect: PERFECT_WINDOW_S,
            great: GREAT_WINDOW_S,
            good: GOOD_WINDOW_S,
            miss: MISS_WINDOW_S,
        }
    }
}

impl TimingWindows {
    /// Accepts a window set only if every bound is positive, finite and
    /// strictly wider than the previous one.
    pub fn new(marvelous: f32, perfect: f32, great: f32, good: f32, miss: f32) -> Option<Self> {
        let bounds = [marvelous, perfect, great, good, miss];
        let valid = bounds.iter().all(|w| w.is_finite() && *w > 0.0)
            && bounds.windows(2).all(|pair| pair[0] < pair[1]);
        valid.then_some(Self { marvelous, perfect, great, good, miss })
    }

    #[inline(always)]
    pub fn as_array(&self) -> [f32; 5] {
        [self.marvelous, self.perfect, self.great, self.good, self.miss]
    }

    #[inline(always)]
    pub fn miss_s(&self) -> f64 {
        f64::from(self.miss)
    }

    #[inline(always)]
    pub fn as_ms(&self) -> [f32; 5] {
        self.as_array().map(|s| s * 1000.0)
    }
}
