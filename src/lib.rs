//! Chart timing and judgement engine for four-lane dance simfiles.
//!
//! Charts are parsed from `#TAG:value;` text into a [`game::chart::Chart`],
//! then played tick by tick through [`game::gameplay`], which spawns notes
//! ahead of an audio clock, judges presses and expires late notes, and
//! finally produces a scored [`game::stage_stats::JudgementSummary`].

pub mod config;
pub mod game;
