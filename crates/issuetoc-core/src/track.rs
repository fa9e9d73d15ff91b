//! Scroll-driven active-entry selection.

use crate::extract::Outline;
use crate::host::HostPage;

/// Computes which outline entry corresponds to the current viewport
/// position. Pure function of host geometry: identical scroll state always
/// yields the same selection.
#[derive(Debug, Clone)]
pub struct ActiveEntryTracker {
    /// Vertical clearance for fixed host chrome. A heading only counts as
    /// "in view" once its top crosses this line.
    clearance: f64,
}

impl ActiveEntryTracker {
    pub fn new(clearance: f64) -> Self {
        Self { clearance }
    }

    /// Select the active entry's anchor id, or `None` for an empty outline.
    ///
    /// The candidate is the first entry whose clearance-shifted viewport top
    /// is `>= 0` (the first heading not yet scrolled past). Edge rules, in
    /// order:
    ///
    /// 1. No candidate (every heading is above the viewport), or the
    ///    viewport has reached the document's bottom extent: the last entry.
    ///    The two conditions are not mutually exclusive and share one rule.
    /// 2. The candidate's shifted top is strictly positive and it is not the
    ///    first entry: the previous entry, whose section is still the one in
    ///    view until the successor's heading crosses the clearance line.
    /// 3. Otherwise the candidate itself.
    pub fn compute_active<H: HostPage>(&self, host: &H, outline: &Outline) -> Option<String> {
        let entries = outline.entries();
        if entries.is_empty() {
            return None;
        }

        let tops: Vec<Option<f64>> = entries
            .iter()
            .map(|e| host.bounding_top(e.node).map(|top| top - self.clearance))
            .collect();

        let candidate = tops
            .iter()
            .position(|top| matches!(top, Some(t) if *t >= 0.0));

        let index = match candidate {
            None => entries.len() - 1,
            Some(_) if host.scroll_state().at_bottom() => entries.len() - 1,
            Some(i) => {
                let crossed_line = tops[i].is_some_and(|t| t > 0.0);
                if crossed_line && i > 0 { i - 1 } else { i }
            }
        };

        Some(entries[index].anchor_id.clone())
    }
}
