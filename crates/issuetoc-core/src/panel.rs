//! Outline panel rendering, sizing, and click navigation.

use issuetoc_config::{LayoutConfig, SelectorsConfig};
use tracing::debug;

use crate::extract::Outline;
use crate::host::{HostPage, NodeId};

const PANEL_TITLE: &str = "Table of contents";

/// Pure view model for one rendered outline row.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRow {
    pub anchor_id: String,
    pub text: String,
    pub indent_px: u32,
    pub active: bool,
}

/// Compute the row models for an outline: relative indentation against the
/// shallowest level present, and the active highlight flag.
pub fn layout_rows(outline: &Outline, active: Option<&str>, layout: &LayoutConfig) -> Vec<RenderedRow> {
    outline
        .entries()
        .iter()
        .map(|entry| RenderedRow {
            anchor_id: entry.anchor_id.clone(),
            text: entry.text.clone(),
            indent_px: outline.indent_px(entry, layout.indent_unit, layout.base_offset),
            active: active == Some(entry.anchor_id.as_str()),
        })
        .collect()
}

/// One live outline panel, materialised into host nodes under the insertion
/// point. Exactly one instance exists at a time, owned by the orchestrator.
#[derive(Debug)]
pub struct PanelInstance {
    root: NodeId,
    heading: Option<NodeId>,
    list: Option<NodeId>,
    rows: Vec<(String, NodeId)>,
}

impl PanelInstance {
    /// Render the outline into `root`. An empty outline renders nothing:
    /// the panel degrades to invisible rather than showing an empty shell.
    pub fn render<H: HostPage>(
        host: &mut H,
        root: NodeId,
        outline: &Outline,
        layout: &LayoutConfig,
    ) -> Self {
        let mut instance = Self {
            root,
            heading: None,
            list: None,
            rows: Vec::new(),
        };
        if outline.is_empty() {
            debug!("outline empty, panel hidden");
            return instance;
        }

        let heading = host.create_element("div");
        host.set_text(heading, PANEL_TITLE);
        host.set_attr(heading, "class", "outline-heading");
        host.append_child(root, heading);

        let list = host.create_element("ul");
        host.set_attr(list, "class", "outline-list");
        host.append_child(root, list);

        for row in layout_rows(outline, None, layout) {
            let item = host.create_element("li");
            host.set_text(item, &row.text);
            host.set_attr(item, "data-anchor", &row.anchor_id);
            host.set_attr(item, "style", &format!("padding-left: {}px", row.indent_px));
            host.set_attr(item, "class", "outline-item");
            host.append_child(list, item);
            instance.rows.push((row.anchor_id, item));
        }

        instance.heading = Some(heading);
        instance.list = Some(list);
        instance
    }

    /// The insertion point this panel renders into.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Update the highlight state to match the active entry.
    pub fn set_active<H: HostPage>(&self, host: &mut H, active: Option<&str>) {
        for (anchor, node) in &self.rows {
            let class = if active == Some(anchor.as_str()) {
                "outline-item outline-item-active"
            } else {
                "outline-item"
            };
            host.set_attr(*node, "class", class);
        }
    }

    /// Size the insertion point to fill the vertical space left in the
    /// sidebar: layout-region height minus sidebar height, minus the panel's
    /// rendered content height plus the margin/border allowance when
    /// populated. The content height is measured from the heading and list
    /// nodes; the insertion point's own height is an output of this method,
    /// never an input, so recomputation is stable across remounts.
    pub fn fit_height<H: HostPage>(
        &self,
        host: &mut H,
        selectors: &SelectorsConfig,
        layout: &LayoutConfig,
    ) {
        let Some(region) = host.query(&selectors.layout_region) else {
            return;
        };
        let Some(sidebar) = host.query(&selectors.sidebar_region) else {
            return;
        };
        let mut height = host.client_height(region) - host.client_height(sidebar);
        if self.has_rows() {
            let content: f64 = [self.heading, self.list]
                .into_iter()
                .flatten()
                .map(|node| host.client_height(node))
                .sum();
            height -= content + layout.panel_margin;
        }
        host.set_client_height(self.root, height.max(0.0));
    }

    /// Scroll the document so the target heading tops out exactly at the
    /// clearance line. Native anchor jumps would ignore the clearance, so
    /// navigation is always programmatic.
    pub fn navigate_to<H: HostPage>(
        &self,
        host: &mut H,
        outline: &Outline,
        anchor_id: &str,
        clearance: f64,
    ) -> bool {
        let Some(entry) = outline.entry_by_anchor(anchor_id) else {
            return false;
        };
        let Some(top) = host.bounding_top(entry.node) else {
            return false;
        };
        let doc_top = top + host.scroll_state().scroll_y;
        host.scroll_to(doc_top - clearance);
        true
    }

    /// Remove the panel's rendered nodes. The insertion point itself is kept
    /// so the next mount's resolution reuses it.
    pub fn teardown<H: HostPage>(self, host: &mut H) {
        if let Some(heading) = self.heading {
            host.remove(heading);
        }
        if let Some(list) = self.list {
            host.remove(list);
        }
    }
}
