//! Heading discovery and outline construction.

use crate::host::{HostPage, NodeId};

/// Selector covering every heading depth the outline indexes.
pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// One navigable heading: depth, display text, stable anchor id, and a
/// handle to the originating element (position queries only, valid for the
/// current mount).
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineEntry {
    /// Heading depth as authored, 1–6.
    pub level: u8,
    /// Trimmed display text; always non-empty.
    pub text: String,
    /// `heading-<ordinal>`, dense over kept entries in document order.
    pub anchor_id: String,
    /// The originating element.
    pub node: NodeId,
}

/// Ordered sequence of outline entries in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    entries: Vec<OutlineEntry>,
}

impl Outline {
    pub fn entries(&self) -> &[OutlineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&OutlineEntry> {
        self.entries.last()
    }

    /// Shallowest heading level present. Indentation is always relative to
    /// this, never absolute.
    pub fn min_level(&self) -> Option<u8> {
        self.entries.iter().map(|e| e.level).min()
    }

    /// Pixel indentation for an entry: `(level - min_level) * indent_unit +
    /// base_offset`.
    pub fn indent_px(&self, entry: &OutlineEntry, indent_unit: u32, base_offset: u32) -> u32 {
        let min_level = self.min_level().unwrap_or(entry.level);
        u32::from(entry.level.saturating_sub(min_level)) * indent_unit + base_offset
    }

    pub fn entry_by_anchor(&self, anchor_id: &str) -> Option<&OutlineEntry> {
        self.entries.iter().find(|e| e.anchor_id == anchor_id)
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Scan `container` for headings and build the outline.
///
/// Headings with empty (trimmed) text carry no navigable meaning and are
/// dropped. Anchor ids are assigned densely from 0 over the kept entries in
/// document order, and written back onto the live elements so in-page anchor
/// links and scroll-to-element resolve consistently. That id write-back is a
/// deliberate side effect on the host page, and reassignment is idempotent:
/// content can be replaced and re-extracted many times per page lifetime.
pub fn extract<H: HostPage>(host: &mut H, container: NodeId) -> Outline {
    let mut entries = Vec::new();
    for node in host.query_all_within(container, HEADING_SELECTOR) {
        let Some(level) = host.tag_name(node).and_then(heading_level) else {
            continue;
        };
        let text = host.text_content(node).trim().to_string();
        if text.is_empty() {
            continue;
        }
        let anchor_id = format!("heading-{}", entries.len());
        host.set_id(node, &anchor_id);
        entries.push(OutlineEntry {
            level,
            text,
            anchor_id,
            node,
        });
    }
    Outline { entries }
}
