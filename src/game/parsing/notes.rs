use crate::game::note::{LANE_COUNT, Lane, Note};
use crate::game::parsing::FormatError;

pub const BEATS_PER_MEASURE: f64 = 4.0;

/// Step characters that start a judgable note. Holds (`2`) and rolls (`4`)
/// only contribute their onset; tails, mines and lifts are ignored.
#[inline(always)]
const fn is_tap_onset(c: u8) -> bool {
    matches!(c, b'1' | b'2' | b'4')
}

/// Decodes the measure/row grid of a `#NOTES` block into tap onsets.
///
/// Measures are comma separated; each measure's non-blank, non-comment rows
/// split its four beats evenly. Only the first four columns are read.
pub fn parse_chart_notes(note_data: &str) -> Result<Vec<Note>, FormatError> {
    let mut notes = Vec::with_capacity(1024);
    if note_data.trim().is_empty() {
        return Ok(notes);
    }

    let normalized = note_data.replace('\r', "");
    for (measure_index, measure) in normalized.split(',').filter(|m| !m.is_empty()).enumerate() {
        let rows: Vec<&str> = measure
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .collect();
        if rows.is_empty() {
            continue;
        }

        let rows_in_measure = rows.len() as f64;
        for (row_index, row) in rows.iter().enumerate() {
            let lanes = &row.as_bytes()[..row.len().min(LANE_COUNT)];
            if let Some(bad) = lanes.iter().find(|c| !c.is_ascii_alphanumeric()) {
                return Err(FormatError::InvalidGrid {
                    measure: measure_index,
                    reason: format!("unexpected character {:?} in row {:?}", *bad as char, row),
                });
            }

            let beat = (measure_index as f64 * BEATS_PER_MEASURE)
                + (row_index as f64 / rows_in_measure) * BEATS_PER_MEASURE;
            for (lane_index, &c) in lanes.iter().enumerate() {
                if !is_tap_onset(c) {
                    continue;
                }
                if let Some(lane) = Lane::from_index(lane_index) {
                    notes.push(Note::new(beat, lane));
                }
            }
        }
    }

    Ok(notes)
}
