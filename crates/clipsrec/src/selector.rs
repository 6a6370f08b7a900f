use std::time::Duration;

use tracing::debug;

use crate::Result;
use crate::record::ClipRecord;

/// Take clips in catalog order until their declared durations add up to
/// `budget`.
///
/// The clip that crosses the budget is included. When the whole catalog is
/// shorter than the budget everything is returned. Only visited clips have
/// their duration parsed; a malformed one is fatal. Overlapping clips are not
/// merged and count twice.
pub fn select(clips: Vec<ClipRecord>, budget: Duration) -> Result<Vec<ClipRecord>> {
    let budget_secs = budget.as_secs_f64();
    let mut total = 0.0_f64;
    let mut selected = Vec::new();

    for clip in clips {
        total += clip.duration_secs()?;
        selected.push(clip);

        if total >= budget_secs {
            break;
        }
    }

    debug!(
        selected = selected.len(),
        total_secs = total,
        budget_secs,
        "Clip selection done"
    );
    Ok(selected)
}
