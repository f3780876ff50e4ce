use crate::game::judgment::Judgement;
use crate::game::scores::{self, Grade};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Running tallies for one play session.
#[derive(Clone, Debug, Default)]
pub struct JudgementCounter {
    counts: FxHashMap<Judgement, u32>,
    miss_count: u32,
    current_combo: u32,
    max_combo: u32,
}

impl JudgementCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts a hit tier. Marvelous through Good extend the combo; Bad
    /// breaks it. `Miss` is routed to [`Self::record_miss`] and `None` is
    /// ignored.
    pub fn record(&mut self, tier: Judgement) {
        match tier {
            Judgement::None => {}
            Judgement::Miss => self.record_miss(),
            _ => {
                *self.counts.entry(tier).or_insert(0) += 1;
                if tier.is_combo() {
                    self.current_combo += 1;
                    self.max_combo = self.max_combo.max(self.current_combo);
                } else {
                    self.current_combo = 0;
                }
            }
        }
    }

    pub fn record_miss(&mut self) {
        self.miss_count += 1;
        self.current_combo = 0;
    }

    #[inline(always)]
    pub fn count(&self, tier: Judgement) -> u32 {
        if tier == Judgement::Miss {
            return self.miss_count;
        }
        self.counts.get(&tier).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub const fn miss_count(&self) -> u32 {
        self.miss_count
    }

    #[inline(always)]
    pub const fn current_combo(&self) -> u32 {
        self.current_combo
    }

    #[inline(always)]
    pub const fn max_combo(&self) -> u32 {
        self.max_combo
    }

    /// Number of notes resolved so far, hit or missed.
    pub fn judged(&self) -> u32 {
        self.counts.values().sum::<u32>() + self.miss_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshots the tallies. The run counts as failed when declared so or
    /// when every note was missed.
    pub fn finalize(&self, total_notes: u32, declared_failed: bool) -> JudgementSummary {
        let failed = declared_failed || (total_notes > 0 && self.miss_count >= total_notes);
        let score = scores::calculate_score(&self.counts, total_notes);
        JudgementSummary {
            counts: Judgement::HIT_TIERS.map(|tier| TierCount { tier, count: self.count(tier) }),
            miss_count: self.miss_count,
            max_combo: self.max_combo,
            total_notes,
            score,
            failed,
            grade: scores::score_to_grade(score, failed),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TierCount {
    pub tier: Judgement,
    pub count: u32,
}

/// Immutable end-of-session result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JudgementSummary {
    pub counts: [TierCount; 5],
    pub miss_count: u32,
    pub max_combo: u32,
    pub total_notes: u32,
    pub score: u32,
    pub failed: bool,
    pub grade: Grade,
}

impl JudgementSummary {
    pub fn count(&self, tier: Judgement) -> u32 {
        if tier == Judgement::Miss {
            return self.miss_count;
        }
        self.counts.iter().find(|c| c.tier == tier).map_or(0, |c| c.count)
    }
}
