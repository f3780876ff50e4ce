use crate::game::chart::Chart;
use crate::game::judgment::{self, JudgementOutcome};
use crate::game::note::{LANE_COUNT, Lane, LiveNote};
use crate::game::stage_stats::{JudgementCounter, JudgementSummary};
use crate::game::timing_windows::TimingWindows;
use log::{debug, info};
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::Arc;

/// Gap between starting the clock and the music's first sample.
pub const LEAD_IN_SECONDS: f64 = 0.2;
pub const DEFAULT_TRAVEL_TIME_SECONDS: f64 = 2.6;
pub const DEFAULT_END_DELAY_SECONDS: f64 = 0.8;

// --- CLOCK ---

/// Maps an audio device clock onto chart time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SongClock {
    dsp_start: f64,
    chart_offset: f64,
    output_latency: f64,
}

impl SongClock {
    /// Schedules playback `LEAD_IN_SECONDS` after `now_dsp`.
    pub fn start(now_dsp: f64, chart: &Chart, output_latency: f64) -> Self {
        Self {
            dsp_start: now_dsp + LEAD_IN_SECONDS,
            chart_offset: chart.offset_seconds(),
            output_latency,
        }
    }

    #[inline(always)]
    pub const fn dsp_start(&self) -> f64 {
        self.dsp_start
    }

    #[inline(always)]
    pub fn has_started(&self, now_dsp: f64) -> bool {
        now_dsp >= self.dsp_start
    }

    #[inline(always)]
    pub fn song_time(&self, now_dsp: f64) -> f64 {
        (now_dsp - self.dsp_start) - self.chart_offset - self.output_latency
    }
}

// --- SESSION CONFIG ---

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    /// Lead time at the chart's base tempo.
    pub travel_time_seconds: f64,
    pub windows: TimingWindows,
    pub end_when_chart_finished: bool,
    pub end_delay_seconds: f64,
    pub output_latency_seconds: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            travel_time_seconds: DEFAULT_TRAVEL_TIME_SECONDS,
            windows: TimingWindows::default(),
            end_when_chart_finished: true,
            end_delay_seconds: DEFAULT_END_DELAY_SECONDS,
            output_latency_seconds: 0.0,
        }
    }
}

// --- END OF CHART ---

/// Decides when a performance is over.
///
/// With `end_when_chart_finished`, the session ends once every note has
/// been dispatched and resolved and `delay` seconds of song time have
/// passed without new live notes. Independently, it ends when everything
/// is dispatched and the audio has stopped.
#[derive(Clone, Debug, PartialEq)]
pub struct EndOfChart {
    end_when_chart_finished: bool,
    delay: f64,
    finished_at: Option<f64>,
}

impl EndOfChart {
    pub fn new(end_when_chart_finished: bool, delay: f64) -> Self {
        Self { end_when_chart_finished, delay, finished_at: None }
    }

    pub fn should_end(&mut self, song_time: f64, all_spawned: bool, any_live: bool, audio_playing: bool) -> bool {
        if self.end_when_chart_finished {
            if all_spawned && !any_live {
                let since = *self.finished_at.get_or_insert(song_time);
                return song_time - since >= self.delay;
            }
            self.finished_at = None;
        }
        all_spawned && !audio_playing
    }
}

// --- STATE ---

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Finalized,
}

/// What the host observed this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickInput {
    pub song_time: f64,
    /// Fresh press edges, indexed by [`Lane::index`].
    pub pressed: [bool; LANE_COUNT],
    pub audio_playing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JudgementEvent {
    pub lane: Lane,
    /// The note that was resolved, if any. `None` for presses that matched
    /// nothing.
    pub note: Option<LiveNote>,
    pub outcome: JudgementOutcome,
    /// Combo right after this event was recorded.
    pub combo: u32,
}

pub type SpawnEvents = SmallVec<[LiveNote; 8]>;
pub type JudgementEvents = SmallVec<[JudgementEvent; 8]>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickOutput {
    pub spawned: SpawnEvents,
    pub judgements: JudgementEvents,
    /// Combo once the whole tick was recorded.
    pub combo: u32,
    pub finished: bool,
}

pub struct State {
    pub chart: Arc<Chart>,
    pub config: SessionConfig,
    phase: Phase,
    note_spawn_cursor: usize,
    lanes: [VecDeque<LiveNote>; LANE_COUNT],
    counter: JudgementCounter,
    end_of_chart: EndOfChart,
    current_song_time: f64,
    summary: Option<Arc<JudgementSummary>>,
}

pub fn init(chart: Arc<Chart>, config: SessionConfig) -> State {
    let end_of_chart = EndOfChart::new(config.end_when_chart_finished, config.end_delay_seconds);
    State {
        chart,
        config,
        phase: Phase::Idle,
        note_spawn_cursor: 0,
        lanes: std::array::from_fn(|_| VecDeque::with_capacity(32)),
        counter: JudgementCounter::new(),
        end_of_chart,
        current_song_time: f64::NEG_INFINITY,
        summary: None,
    }
}

impl State {
    #[inline(always)]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[inline(always)]
    pub fn all_spawned(&self) -> bool {
        self.note_spawn_cursor >= self.chart.notes().len()
    }

    #[inline(always)]
    pub fn live_notes(&self, lane: Lane) -> &VecDeque<LiveNote> {
        &self.lanes[lane.index()]
    }

    pub fn live_note_count(&self) -> usize {
        self.lanes.iter().map(VecDeque::len).sum()
    }

    #[inline(always)]
    pub const fn counter(&self) -> &JudgementCounter {
        &self.counter
    }

    #[inline(always)]
    pub const fn current_song_time(&self) -> f64 {
        self.current_song_time
    }

    pub fn summary(&self) -> Option<Arc<JudgementSummary>> {
        self.summary.clone()
    }

    /// Lead time for a note at `beat`, scaled by the local tempo against
    /// the chart's base tempo.
    pub fn travel_time_at(&self, beat: f64) -> f64 {
        let bpm = self.chart.bpm_at_beat(beat);
        if bpm <= 0.0 {
            return self.config.travel_time_seconds;
        }
        self.config.travel_time_seconds * f64::from(self.chart.base_bpm()) / bpm
    }
}

// --- TICK ---

fn spawn_lookahead_notes(state: &mut State, song_time: f64, out: &mut SpawnEvents) {
    let notes = state.chart.notes();
    let mut cursor = state.note_spawn_cursor;
    while let Some(note) = notes.get(cursor) {
        let time_sec = state.chart.beat_to_seconds(note.beat);
        let travel_sec = state.travel_time_at(note.beat);
        if song_time < time_sec - travel_sec {
            break;
        }
        let live = LiveNote { note_index: cursor, beat: note.beat, lane: note.lane, time_sec, travel_sec };
        state.lanes[note.lane.index()].push_back(live);
        out.push(live);
        cursor += 1;
    }
    state.note_spawn_cursor = cursor;
}

/// Matches a press against the earliest live note in `lane`.
fn judge_a_tap(state: &mut State, lane: Lane, song_time: f64, out: &mut JudgementEvents) {
    let queue = &mut state.lanes[lane.index()];
    let Some(front) = queue.front().copied() else {
        debug!("{lane:?}: empty swing at {song_time:.4}");
        let combo = state.counter.current_combo();
        out.push(JudgementEvent { lane, note: None, outcome: JudgementOutcome::EMPTY_SWING, combo });
        return;
    };

    let dt = (front.time_sec - song_time).abs();
    let outcome = judgment::evaluate(dt, &state.config.windows);
    if !outcome.should_consume_note {
        debug!("{lane:?}: press {:.1}ms from the next note, outside the miss window", dt * 1000.0);
        let combo = state.counter.current_combo();
        out.push(JudgementEvent { lane, note: None, outcome, combo });
        return;
    }

    queue.pop_front();
    state.counter.record(outcome.tier);
    debug!(
        "{lane:?}: {} (offset {:+.1}ms, combo {})",
        outcome.tier.label(),
        (song_time - front.time_sec) * 1000.0,
        state.counter.current_combo()
    );
    let combo = state.counter.current_combo();
    out.push(JudgementEvent { lane, note: Some(front), outcome, combo });
}

fn apply_time_based_misses(state: &mut State, song_time: f64, out: &mut JudgementEvents) {
    let miss_window = state.config.windows.miss_s();
    for lane in Lane::ALL {
        let queue = &mut state.lanes[lane.index()];
        // Strict: a note exactly on its boundary can still be hit this tick.
        while let Some(front) = queue.front().copied() {
            if song_time <= front.time_sec + miss_window {
                break;
            }
            queue.pop_front();
            state.counter.record_miss();
            debug!("{lane:?}: MISSED (time-based) beat {:.3}", front.beat);
            out.push(JudgementEvent { lane, note: Some(front), outcome: JudgementOutcome::MISS, combo: 0 });
        }
    }
}

/// Advances the session to `input.song_time`: spawn, resolve presses,
/// expire late notes, then check for the end of the chart.
pub fn update(state: &mut State, input: &TickInput) -> TickOutput {
    let mut out = TickOutput::default();
    match state.phase {
        Phase::Finalized => {
            out.combo = state.counter.current_combo();
            out.finished = true;
            return out;
        }
        Phase::Idle => {
            debug!("Session started at song time {:.3}", input.song_time);
            state.phase = Phase::Active;
        }
        Phase::Active => {}
    }

    let song_time = input.song_time;
    state.current_song_time = song_time;

    spawn_lookahead_notes(state, song_time, &mut out.spawned);
    for lane in Lane::ALL {
        if input.pressed[lane.index()] {
            judge_a_tap(state, lane, song_time, &mut out.judgements);
        }
    }
    apply_time_based_misses(state, song_time, &mut out.judgements);

    let all_spawned = state.all_spawned();
    let any_live = state.lanes.iter().any(|q| !q.is_empty());
    out.combo = state.counter.current_combo();
    out.finished = state.end_of_chart.should_end(song_time, all_spawned, any_live, input.audio_playing);
    out
}

/// Ends the session. Live notes are discarded without being judged. Calling
/// this again returns the same summary.
pub fn finish(state: &mut State, declared_failed: bool) -> Arc<JudgementSummary> {
    if let Some(summary) = &state.summary {
        return Arc::clone(summary);
    }

    for queue in &mut state.lanes {
        queue.clear();
    }
    let total_notes = u32::try_from(state.chart.notes().len()).unwrap_or(u32::MAX);
    let summary = Arc::new(state.counter.finalize(total_notes, declared_failed));
    info!(
        "Session finished: score={}, grade={}, max combo={}, misses={}/{}",
        summary.score, summary.grade, summary.max_combo, summary.miss_count, summary.total_notes
    );
    state.phase = Phase::Finalized;
    state.summary = Some(Arc::clone(&summary));
    summary
}

#[cfg(test)]
mod tests {
    use super::{EndOfChart, Phase, SessionConfig, SongClock, TickInput, finish, init, update};
    use crate::game::chart::{Chart, TempoChange};
    use crate::game::judgment::Judgement;
    use crate::game::note::{Lane, Note};
    use crate::game::scores::Grade;
    use std::sync::Arc;

    fn chart(notes: Vec<Note>, tempo: Vec<TempoChange>, base_bpm: i32) -> Arc<Chart> {
        Arc::new(Chart::new("song.ogg".to_string(), base_bpm, 0.0, notes, tempo).expect("valid chart"))
    }

    fn four_lane_chart() -> Arc<Chart> {
        let notes = Lane::ALL.iter().enumerate().map(|(i, lane)| Note::new(i as f64, *lane)).collect();
        chart(notes, vec![TempoChange::new(0.0, 120.0)], 120)
    }

    fn tick(song_time: f64) -> TickInput {
        TickInput { song_time, pressed: [false; 4], audio_playing: true }
    }

    fn press(song_time: f64, lane: Lane) -> TickInput {
        let mut input = tick(song_time);
        input.pressed[lane.index()] = true;
        input
    }

    #[test]
    fn song_clock_subtracts_lead_in_offset_and_latency() {
        let c = Chart::new(String::new(), 120, -0.1, Vec::new(), Vec::new()).expect("valid chart");
        let clock = SongClock::start(10.0, &c, 0.02);
        assert!(!clock.has_started(10.1));
        assert!(clock.has_started(10.2));
        assert!((clock.song_time(10.2) - 0.08).abs() < 1e-12);
        assert!((clock.song_time(11.2) - 1.08).abs() < 1e-12);
    }

    #[test]
    fn notes_spawn_one_travel_time_early() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        assert_eq!(state.phase(), Phase::Idle);

        // Note at beat 1 is at 0.5s and spawns at 0.5 - 2.6.
        let out = update(&mut state, &tick(-2.2));
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(out.spawned.len(), 1);
        assert_eq!(out.spawned[0].lane, Lane::Left);

        let out = update(&mut state, &tick(-2.0));
        assert_eq!(out.spawned.len(), 1);
        assert_eq!(out.spawned[0].lane, Lane::Down);
        assert!((out.spawned[0].time_sec - 0.5).abs() < 1e-12);
        assert!(!state.all_spawned());
    }

    #[test]
    fn travel_time_scales_with_local_tempo() {
        let notes = vec![Note::new(0.0, Lane::Up), Note::new(8.0, Lane::Up)];
        let tempo = vec![TempoChange::new(0.0, 120.0), TempoChange::new(4.0, 240.0)];
        let state = init(chart(notes, tempo, 120), SessionConfig::default());
        assert!((state.travel_time_at(0.0) - 2.6).abs() < 1e-12);
        assert!((state.travel_time_at(8.0) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn repeated_ticks_never_spawn_twice() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        let mut spawned = 0;
        for _ in 0..5 {
            spawned += update(&mut state, &tick(0.0)).spawned.len();
        }
        assert_eq!(spawned, 4);
        assert!(state.all_spawned());
        assert_eq!(state.live_note_count(), 4);
    }

    #[test]
    fn press_consumes_only_the_earliest_note() {
        let notes = vec![Note::new(0.0, Lane::Left), Note::new(0.25, Lane::Left)];
        let mut state = init(chart(notes, Vec::new(), 120), SessionConfig::default());
        // Closer to the second note, but the first is still judged.
        let out = update(&mut state, &press(0.12, Lane::Left));
        assert_eq!(out.judgements.len(), 1);
        let event = out.judgements[0];
        assert_eq!(event.note.map(|n| n.note_index), Some(0));
        assert_eq!(event.outcome.tier, Judgement::Bad);
        assert_eq!(state.live_notes(Lane::Left).len(), 1);
        assert_eq!(out.combo, 0);
    }

    #[test]
    fn empty_swing_is_not_a_miss() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        update(&mut state, &tick(0.0));
        let out = update(&mut state, &press(0.0, Lane::Right));
        assert_eq!(out.judgements[0].outcome.tier, Judgement::None);
        assert!(out.judgements[0].note.is_none());
        assert_eq!(state.counter().miss_count(), 0);
        assert_eq!(state.live_notes(Lane::Right).len(), 1);

        let mut empty = init(chart(Vec::new(), Vec::new(), 120), SessionConfig::default());
        let out = update(&mut empty, &press(0.0, Lane::Up));
        assert_eq!(out.judgements[0].outcome.tier, Judgement::None);
    }

    #[test]
    fn note_on_its_miss_boundary_can_still_be_hit() {
        let notes = vec![Note::new(2.0, Lane::Down)];
        let mut state = init(chart(notes, Vec::new(), 120), SessionConfig::default());
        update(&mut state, &tick(0.0));
        let boundary = 1.0 + f64::from(state.config.windows.miss);
        let out = update(&mut state, &press(boundary, Lane::Down));
        assert_eq!(out.judgements.len(), 1);
        assert_eq!(out.judgements[0].outcome.tier, Judgement::Bad);
        assert_eq!(state.counter().miss_count(), 0);
    }

    #[test]
    fn late_notes_expire_once_each() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        update(&mut state, &tick(0.0));
        let out = update(&mut state, &tick(10.0));
        assert_eq!(out.judgements.len(), 4);
        assert!(out.judgements.iter().all(|e| e.outcome.tier == Judgement::Miss));
        let again = update(&mut state, &tick(10.0));
        assert!(again.judgements.is_empty());
        assert_eq!(state.counter().miss_count(), 4);
    }

    #[test]
    fn consecutive_misses_in_one_lane_drain_in_one_tick() {
        let notes = (0..3).map(|i| Note::new(f64::from(i) * 0.5, Lane::Up)).collect();
        let mut state = init(chart(notes, Vec::new(), 120), SessionConfig::default());
        update(&mut state, &tick(0.0));
        let out = update(&mut state, &tick(5.0));
        let indices: Vec<usize> = out.judgements.iter().filter_map(|e| e.note.map(|n| n.note_index)).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn each_event_carries_the_combo_it_left_behind() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        update(&mut state, &tick(0.0));
        let out = update(&mut state, &press(0.0, Lane::Left));
        assert_eq!(out.judgements[0].combo, 1);

        // Down (0.5s) times out in the same tick that Up (1.0s) is hit.
        let out = update(&mut state, &press(1.0, Lane::Up));
        let seen: Vec<(Judgement, u32)> = out.judgements.iter().map(|e| (e.outcome.tier, e.combo)).collect();
        assert_eq!(seen, vec![(Judgement::Marvelous, 2), (Judgement::Miss, 0)]);
        assert_eq!(out.combo, 0);
        assert_eq!(state.counter().max_combo(), 2);

        let out = update(&mut state, &press(1.0, Lane::Left));
        assert_eq!(out.judgements[0].outcome.tier, Judgement::None);
        assert_eq!(out.judgements[0].combo, 0);
    }

    #[test]
    fn end_of_chart_waits_for_the_grace_delay() {
        let mut end = EndOfChart::new(true, 0.8);
        assert!(!end.should_end(1.0, false, false, true));
        assert!(!end.should_end(2.0, true, false, true));
        assert!(!end.should_end(2.5, true, false, true));
        assert!(end.should_end(3.0, true, false, true));

        // A live note resets the timer.
        let mut end = EndOfChart::new(true, 0.8);
        assert!(!end.should_end(2.0, true, false, true));
        assert!(!end.should_end(2.5, true, true, true));
        assert!(!end.should_end(3.0, true, false, true));
        assert!(!end.should_end(3.5, true, false, true));
        assert!(end.should_end(4.0, true, false, true));
    }

    #[test]
    fn end_of_chart_follows_audio_when_not_ending_on_chart() {
        let mut end = EndOfChart::new(false, 0.8);
        assert!(!end.should_end(5.0, true, false, true));
        assert!(!end.should_end(6.0, false, false, false));
        assert!(end.should_end(6.0, true, true, false));
    }

    #[test]
    fn perfect_play_through_the_session() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        let mut finished = false;
        let mut marvelous = 0;
        // Ten-millisecond ticks from -3.0s; notes sit at 0.0, 0.5, 1.0 and 1.5s.
        for step in 0..700 {
            let mut input = tick(f64::from(step - 300) / 100.0);
            for (i, lane) in (0..).zip(Lane::ALL) {
                if step == 300 + i * 50 {
                    input.pressed[lane.index()] = true;
                }
            }
            let out = update(&mut state, &input);
            marvelous += out.judgements.iter().filter(|e| e.outcome.tier == Judgement::Marvelous).count();
            if out.finished {
                finished = true;
                break;
            }
        }
        assert!(finished);
        assert_eq!(marvelous, 4);

        let summary = finish(&mut state, false);
        assert_eq!(summary.max_combo, 4);
        assert_eq!(summary.score, 1_000_000);
        assert_eq!(summary.grade, Grade::AAA);
        assert!(Arc::ptr_eq(&summary, &finish(&mut state, false)));
        assert_eq!(state.phase(), Phase::Finalized);
        assert!(update(&mut state, &tick(99.0)).finished);
    }

    #[test]
    fn finishing_early_discards_live_notes() {
        let mut state = init(four_lane_chart(), SessionConfig::default());
        update(&mut state, &tick(0.0));
        update(&mut state, &press(0.0, Lane::Left));
        let summary = finish(&mut state, false);
        assert_eq!(state.live_note_count(), 0);
        assert_eq!(summary.count(Judgement::Marvelous), 1);
        assert_eq!(summary.miss_count, 0);
        assert_eq!(summary.total_notes, 4);
    }
}
