use crate::game::stage_stats::JudgementSummary;
use log::info;

pub const MAX_STAGES: u32 = 3;

/// Where a run goes after a stage result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    NextStage,
    RunCleared,
    RunFailed,
}

/// A fixed-length sequence of stages. A failed stage ends the run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArcadeRun {
    running: bool,
    current_stage: u32,
    played: Vec<String>,
}

impl ArcadeRun {
    pub fn start() -> Self {
        Self { running: true, current_stage: 1, played: Vec::with_capacity(MAX_STAGES as usize) }
    }

    #[inline(always)]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[inline(always)]
    pub const fn current_stage(&self) -> u32 {
        self.current_stage
    }

    #[inline(always)]
    pub const fn is_finished(&self) -> bool {
        self.current_stage > MAX_STAGES
    }

    pub fn played(&self) -> &[String] {
        &self.played
    }

    pub fn stage_label(&self) -> String {
        if self.current_stage >= MAX_STAGES {
            "FINAL STAGE".to_string()
        } else {
            format!("STAGE {}", self.current_stage)
        }
    }

    pub fn on_stage_cleared(&mut self, song_title: &str) {
        if !song_title.is_empty() {
            self.played.push(song_title.to_string());
        }
        self.current_stage += 1;
    }

    pub fn on_stage_failed(&mut self) {
        self.running = false;
    }

    /// Applies a finished stage and says what comes next.
    pub fn record_result(&mut self, song_title: &str, summary: &JudgementSummary) -> NextStep {
        if !self.running {
            return NextStep::RunFailed;
        }
        if summary.failed {
            info!("Stage {} failed on {song_title:?}; run over.", self.current_stage);
            self.on_stage_failed();
            return NextStep::RunFailed;
        }

        self.on_stage_cleared(song_title);
        if self.is_finished() {
            info!("Run cleared: {} stages.", self.played.len());
            self.running = false;
            NextStep::RunCleared
        } else {
            NextStep::NextStage
        }
    }
}
