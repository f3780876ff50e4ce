use crate::game::judgment::Judgement;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;

pub const MAX_SCORE: u32 = 1_000_000;

// --- Grade Definitions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Grade {
    #[serde(rename = "AAA")]
    AAA,
    #[serde(rename = "AA+")]
    AAPlus,
    #[serde(rename = "AA")]
    AA,
    #[serde(rename = "AA-")]
    AAMinus,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    /// Failed run, whatever the score.
    #[serde(rename = "E")]
    E,
}

impl Grade {
    pub const fn as_str(self) -> &'static str {
        match self {
            Grade::AAA => "AAA",
            Grade::AAPlus => "AA+",
            Grade::AA => "AA",
            Grade::AAMinus => "AA-",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::E => "E",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Descending; the first threshold the score reaches wins.
const GRADE_THRESHOLDS: [(u32, Grade); 14] = [
    (990_000, Grade::AAA),
    (950_000, Grade::AAPlus),
    (900_000, Grade::AA),
    (890_000, Grade::AAMinus),
    (850_000, Grade::APlus),
    (800_000, Grade::A),
    (790_000, Grade::AMinus),
    (750_000, Grade::BPlus),
    (700_000, Grade::B),
    (690_000, Grade::BMinus),
    (650_000, Grade::CPlus),
    (600_000, Grade::C),
    (590_000, Grade::CMinus),
    (550_000, Grade::DPlus),
];

pub fn score_to_grade(score: u32, failed: bool) -> Grade {
    if failed {
        return Grade::E;
    }
    GRADE_THRESHOLDS
        .iter()
        .find(|(min, _)| score >= *min)
        .map_or(Grade::D, |(_, grade)| *grade)
}

// --- Score Calculation ---

/// Per-note value of a Marvelous: an even share of the maximum score,
/// truncated to a multiple of ten.
#[inline(always)]
pub const fn base_point(total_notes: u32) -> u32 {
    if total_notes == 0 {
        return 0;
    }
    (MAX_SCORE / total_notes) / 10 * 10
}

pub fn points_for(tier: Judgement, total_notes: u32) -> u32 {
    let base = base_point(total_notes);
    match tier {
        Judgement::Marvelous => base,
        Judgement::Perfect => base.saturating_sub(10),
        Judgement::Great => (base * 60 / 100).saturating_sub(10),
        Judgement::Good => (base * 20 / 100).saturating_sub(10),
        Judgement::Bad | Judgement::Miss | Judgement::None => 0,
    }
}

pub fn calculate_score(counts: &FxHashMap<Judgement, u32>, total_notes: u32) -> u32 {
    if total_notes == 0 {
        return 0;
    }
    let total: u64 = counts
        .iter()
        .map(|(tier, count)| u64::from(points_for(*tier, total_notes)) * u64::from(*count))
        .sum();
    u32::try_from(total).unwrap_or(u32::MAX)
}
