use crate::game::difficulty::Difficulty;
use crate::game::parsing::simfile::{SINGLE_STYLE, split_notes_fields};
use crate::game::parsing::tags::{HeaderTags, TagMap};
use serde::Serialize;

/// Song-level metadata read from the header section alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SongHeader {
    pub title: String,
    pub subtitle: String,
    pub artist: String,
    pub music: String,
    pub offset: f64,
    pub sample_start: Option<f64>,
    pub sample_length: Option<f64>,
    pub display_bpm: String,
}

#[inline(always)]
fn parse_opt_f64(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl SongHeader {
    pub fn from_header(tags: &HeaderTags) -> Self {
        let text = |name: &str| tags.get(name).unwrap_or_default().to_string();
        Self {
            title: text("TITLE"),
            subtitle: text("SUBTITLE"),
            artist: text("ARTIST"),
            music: text("MUSIC"),
            offset: parse_opt_f64(tags.get("OFFSET")).unwrap_or(0.0),
            sample_start: parse_opt_f64(tags.get("SAMPLESTART")),
            sample_length: parse_opt_f64(tags.get("SAMPLELENGTH")),
            display_bpm: text("DISPLAYBPM"),
        }
    }

    pub fn display_title(&self) -> String {
        if self.subtitle.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.subtitle)
        }
    }

    #[inline(always)]
    fn parse_display_bpm_tag(s: &str) -> Option<(f64, f64)> {
        let parse_pair = |a: &str, b: &str| -> Option<(f64, f64)> {
            let a = a.trim().parse::<f64>().ok()?;
            let b = b.trim().parse::<f64>().ok()?;
            Some((a.min(b), a.max(b)))
        };
        if let Some((a, b)) = s.split_once(':') {
            return parse_pair(a, b);
        }
        let v = s.parse::<f64>().ok()?;
        Some((v, v))
    }

    /// `DISPLAYBPM` as a `(low, high)` range. `*` and non-positive values
    /// have no range.
    pub fn display_bpm_range(&self) -> Option<(f64, f64)> {
        let s = self.display_bpm.trim();
        if !s.is_empty()
            && s != "*"
            && let Some((lo, hi)) = Self::parse_display_bpm_tag(s)
            && lo.is_finite()
            && hi.is_finite()
            && lo > 0.0
            && hi > 0.0
        {
            return Some((lo, hi));
        }
        None
    }

    pub fn formatted_display_bpm(&self) -> String {
        let Some((lo, hi)) = self.display_bpm_range() else {
            return String::new();
        };
        let lo_i = lo.round() as i32;
        let hi_i = hi.round() as i32;
        if lo_i == hi_i { lo_i.to_string() } else { format!("{lo_i} - {hi_i}") }
    }
}

/// First meter per difficulty across single-style `#NOTES` blocks.
/// Unknown difficulty names and non-integer meters are skipped.
pub fn difficulty_meters(tags: &TagMap) -> Vec<(Difficulty, i32)> {
    let mut meters: Vec<(Difficulty, i32)> = Vec::with_capacity(Difficulty::ALL.len());
    for entry in tags.all("NOTES") {
        let Some(fields) = split_notes_fields(entry) else {
            continue;
        };
        if !fields[0].trim().eq_ignore_ascii_case(SINGLE_STYLE) {
            continue;
        }
        let Some(difficulty) = Difficulty::from_sm_name(fields[2]) else {
            continue;
        };
        let Ok(meter) = fields[3].trim().parse::<i32>() else {
            continue;
        };
        if !meters.iter().any(|(d, _)| *d == difficulty) {
            meters.push((difficulty, meter));
        }
    }
    meters.sort_by_key(|(d, _)| *d);
    meters
}
