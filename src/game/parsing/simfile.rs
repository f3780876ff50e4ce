use crate::game::chart::{Chart, DEFAULT_BPM, TempoChange, normalize_tempo_segments};
use crate::game::difficulty::Difficulty;
use crate::game::parsing::notes::parse_chart_notes;
use crate::game::parsing::tags::{HeaderTags, TagMap, parse_all_tags, parse_header};
use crate::game::parsing::{FormatError, LoadError};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use std::fs;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use twox_hash::XxHash64;

pub const SINGLE_STYLE: &str = "dance-single";
const NOTES_FIELDS: usize = 6;

/// Splits a raw `#NOTES` value into its six colon-delimited fields:
/// style, credit, difficulty, meter, radar values and the note grid.
pub fn split_notes_fields(entry: &str) -> Option<[&str; NOTES_FIELDS]> {
    let parts: Vec<&str> = entry.splitn(NOTES_FIELDS, ':').collect();
    parts.try_into().ok()
}

#[inline(always)]
fn is_single_style(fields: &[&str; NOTES_FIELDS]) -> bool {
    fields[0].trim().eq_ignore_ascii_case(SINGLE_STYLE)
}

/// Picks the note grid for `difficulty`:
/// 1. the single-style block whose difficulty name matches,
/// 2. else the first single-style block,
/// 3. else the very first block, whatever its style.
pub fn select_notes_data(tags: &TagMap, difficulty: Difficulty) -> Result<&str, FormatError> {
    let blocks = tags.all("NOTES");
    if blocks.is_empty() {
        return Err(FormatError::MissingNotes);
    }

    let wanted = difficulty.sm_name();
    let exact = blocks.iter().find_map(|entry| {
        let fields = split_notes_fields(entry)?;
        (is_single_style(&fields) && fields[2].trim().eq_ignore_ascii_case(wanted)).then_some(fields[5])
    });
    if let Some(grid) = exact {
        return Ok(grid);
    }

    let first_single = blocks.iter().find_map(|entry| {
        let fields = split_notes_fields(entry)?;
        is_single_style(&fields).then_some(fields[5])
    });
    if let Some(grid) = first_single {
        warn!("No {wanted} single chart; falling back to the first single-style chart.");
        return Ok(grid);
    }

    warn!("No single-style chart; falling back to the first NOTES block.");
    let first = blocks[0].as_str();
    Ok(split_notes_fields(first).map_or(first, |fields| fields[5]))
}

/// Parses a `#BPMS` list of `beat=bpm` pairs. Entries that are not two
/// numbers, or whose bpm is not positive, are dropped.
pub fn parse_bpms(value: &str) -> Vec<TempoChange> {
    let mut out = Vec::new();
    for entry in value.split(',') {
        if entry.trim().is_empty() {
            continue;
        }
        let mut parts = entry.split('=');
        let (Some(beat_str), Some(bpm_str), None) = (parts.next(), parts.next(), parts.next()) else {
            warn!("Dropping malformed BPMS entry {:?}", entry.trim());
            continue;
        };
        let (Ok(beat), Ok(bpm)) = (beat_str.trim().parse::<f64>(), bpm_str.trim().parse::<f64>()) else {
            warn!("Dropping unparsable BPMS entry {:?}", entry.trim());
            continue;
        };
        if bpm <= 0.0 || !bpm.is_finite() || !beat.is_finite() {
            warn!("Dropping non-positive BPMS entry {:?}", entry.trim());
            continue;
        }
        out.push(TempoChange::new(beat, bpm));
    }
    out
}

#[inline(always)]
fn parse_f64_or(value: Option<&str>, fallback: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(fallback)
}

/// Builds a [`Chart`] for one difficulty from a file's tag mapping.
pub fn parse_chart(tags: &TagMap, difficulty: Difficulty) -> Result<Chart, FormatError> {
    let music = tags.first("MUSIC").unwrap_or_default().trim().to_string();
    let offset = parse_f64_or(tags.first("OFFSET"), 0.0);
    let mut tempo = parse_bpms(tags.first("BPMS").unwrap_or_default());
    let note_data = select_notes_data(tags, difficulty)?;

    // Base tempo is the earliest declared change, even when a later one at
    // the same beat overrides it on the timeline.
    tempo.sort_by(|a, b| a.beat.total_cmp(&b.beat));
    let rounded = tempo.first().map_or(DEFAULT_BPM, |seg| seg.bpm).round_ties_even();
    normalize_tempo_segments(&mut tempo);
    let base_bpm = if rounded >= f64::from(i32::MAX) { i32::MAX } else { rounded as i32 };

    let notes = parse_chart_notes(note_data)?;
    let chart = Chart::new(music, base_bpm, -offset, notes, tempo)?;
    info!(
        "Loaded chart: music={:?}, notes={}, offset={:.3}, bpm={}, tempo segments={}",
        chart.music_file(),
        chart.notes().len(),
        chart.offset_seconds(),
        chart.base_bpm(),
        chart.tempo_segments().len()
    );
    Ok(chart)
}

/// Tokenizes and parses simfile text in one step.
pub fn parse_simfile(content: &str, difficulty: Difficulty) -> Result<Chart, FormatError> {
    parse_chart(&parse_all_tags(content), difficulty)
}

/// Reads and parses a simfile without going through a cache.
pub fn load_chart_from_path(path: &Path, difficulty: Difficulty) -> Result<Chart, LoadError> {
    let bytes = fs::read(path).map_err(|e| io_error(path, e))?;
    Ok(parse_simfile(&String::from_utf8_lossy(&bytes), difficulty)?)
}

// --- CACHING ---

struct CacheEntry {
    modified: Option<SystemTime>,
    content_hash: u64,
    content: Arc<str>,
    header: Option<Arc<HeaderTags>>,
    all_tags: Option<Arc<TagMap>>,
}

/// Keeps simfile text and its tag parses keyed by canonical path, re-reading
/// a file only when its modification time moves.
pub struct SimfileCache {
    enabled: bool,
    entries: FxHashMap<PathBuf, CacheEntry>,
}

fn get_content_hash(bytes: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(bytes);
    hasher.finish()
}

fn io_error(path: &Path, source: std::io::Error) -> LoadError {
    LoadError::Io { path: path.to_path_buf(), source }
}

impl SimfileCache {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, entries: FxHashMap::default() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry(&mut self, path: &Path) -> Result<&mut CacheEntry, LoadError> {
        let key = path.canonicalize().map_err(|e| io_error(path, e))?;
        let modified = match fs::metadata(&key).and_then(|m| m.modified()) {
            Ok(time) => Some(time),
            Err(e) => {
                warn!("Could not read modification time of {key:?}: {e}. Not caching this file.");
                None
            }
        };

        let enabled = self.enabled;
        let fresh = enabled
            && modified.is_some()
            && self.entries.get(&key).is_some_and(|e| e.modified == modified);
        if !fresh {
            let bytes = fs::read(&key).map_err(|e| io_error(&key, e))?;
            let content_hash = get_content_hash(&bytes);
            match self.entries.get_mut(&key) {
                Some(existing) if enabled && existing.content_hash == content_hash => {
                    debug!("{key:?} touched but unchanged; keeping cached tags.");
                    existing.modified = modified;
                }
                _ => {
                    let content: Arc<str> = String::from_utf8_lossy(&bytes).into();
                    self.entries.insert(
                        key.clone(),
                        CacheEntry { modified, content_hash, content, header: None, all_tags: None },
                    );
                }
            }
        }

        self.entries.get_mut(&key).ok_or_else(|| {
            io_error(&key, std::io::Error::new(std::io::ErrorKind::NotFound, "cache entry vanished"))
        })
    }

    pub fn content(&mut self, path: &Path) -> Result<Arc<str>, LoadError> {
        Ok(Arc::clone(&self.entry(path)?.content))
    }

    pub fn content_hash(&mut self, path: &Path) -> Result<u64, LoadError> {
        Ok(self.entry(path)?.content_hash)
    }

    pub fn header_tags(&mut self, path: &Path) -> Result<Arc<HeaderTags>, LoadError> {
        let entry = self.entry(path)?;
        let content = &entry.content;
        Ok(Arc::clone(entry.header.get_or_insert_with(|| Arc::new(parse_header(content)))))
    }

    pub fn all_tags(&mut self, path: &Path) -> Result<Arc<TagMap>, LoadError> {
        let entry = self.entry(path)?;
        let content = &entry.content;
        Ok(Arc::clone(entry.all_tags.get_or_insert_with(|| Arc::new(parse_all_tags(content)))))
    }

    /// Loads one difficulty of the simfile at `path`. The referenced music
    /// file is not touched.
    pub fn load_chart(&mut self, path: &Path, difficulty: Difficulty) -> Result<Chart, LoadError> {
        let tags = self.all_tags(path)?;
        Ok(parse_chart(&tags, difficulty)?)
    }
}
