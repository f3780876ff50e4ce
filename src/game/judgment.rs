use crate::game::timing_windows::TimingWindows;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Judgement {
    Marvelous,
    Perfect,
    Great,
    Good,
    Bad,
    // Assigned only by the scheduler, for notes that time out unhit.
    Miss,
    // A press that matched nothing.
    None,
}

impl Judgement {
    /// Tiers that can be recorded against a note, best first.
    pub const HIT_TIERS: [Judgement; 5] = [
        Judgement::Marvelous,
        Judgement::Perfect,
        Judgement::Great,
        Judgement::Good,
        Judgement::Bad,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Marvelous => "Marvelous",
            Self::Perfect => "Perfect",
            Self::Great => "Great",
            Self::Good => "Good",
            Self::Bad => "Bad",
            Self::Miss => "Miss",
            Self::None => "",
        }
    }

    /// Whether recording this tier extends the combo.
    #[inline(always)]
    pub const fn is_combo(self) -> bool {
        matches!(self, Self::Marvelous | Self::Perfect | Self::Great | Self::Good)
    }
}

pub const INTENSITY_FULL: f32 = 1.0;
pub const INTENSITY_GREAT: f32 = 0.75;
pub const INTENSITY_GOOD: f32 = 0.55;
pub const INTENSITY_BAD: f32 = 0.35;

/// Result of classifying one press against the earliest live note.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JudgementOutcome {
    pub tier: Judgement,
    /// Feedback strength for presentation only; never affects scoring.
    pub intensity: f32,
    pub should_consume_note: bool,
}

impl JudgementOutcome {
    #[inline(always)]
    const fn hit(tier: Judgement, intensity: f32) -> Self {
        Self { tier, intensity, should_consume_note: true }
    }

    pub const EMPTY_SWING: Self = Self { tier: Judgement::None, intensity: 0.0, should_consume_note: false };

    /// Outcome attached to a note that expired unhit.
    pub const MISS: Self = Self { tier: Judgement::Miss, intensity: 0.0, should_consume_note: true };
}

/// Classifies an absolute timing distance `dt` (seconds). Each bound is
/// inclusive and checked tightest first. Never returns [`Judgement::Miss`].
pub fn evaluate(dt: f64, windows: &TimingWindows) -> JudgementOutcome {
    let dt = dt.abs();
    if dt.is_nan() || dt > f64::from(windows.miss) {
        return JudgementOutcome::EMPTY_SWING;
    }

    if dt <= f64::from(windows.marvelous) {
        JudgementOutcome::hit(Judgement::Marvelous, INTENSITY_FULL)
    } else if dt <= f64::from(windows.perfect) {
        JudgementOutcome::hit(Judgement::Perfect, INTENSITY_FULL)
    } else if dt <= f64::from(windows.great) {
        JudgementOutcome::hit(Judgement::Great, INTENSITY_GREAT)
    } else if dt <= f64::from(windows.good) {
        JudgementOutcome::hit(Judgement::Good, INTENSITY_GOOD)
    } else {
        JudgementOutcome::hit(Judgement::Bad, INTENSITY_BAD)
    }
}
