//! Host-page abstraction and the in-memory reference backend.
//!
//! The engine never touches a real DOM directly. It reads and writes the host
//! page through [`HostPage`], and receives child-list mutation notifications
//! through [`MutationSource`]. [`MemoryPage`] implements both over a node
//! arena with a small selector engine, and is what every test drives.

use std::collections::HashMap;

use tokio::sync::broadcast;

/// Opaque handle to an element in the host page.
///
/// Handles are cheap copies into the backing arena and are only meaningful
/// for the page that issued them. The engine never retains a handle past the
/// mount cycle that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Snapshot of the host page's scroll position and extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    /// Current vertical scroll offset.
    pub scroll_y: f64,
    /// Height of the visible viewport.
    pub viewport_height: f64,
    /// Total scrollable document height.
    pub document_height: f64,
}

impl ScrollState {
    /// Whether the viewport has reached the document's bottom scroll extent.
    pub fn at_bottom(&self) -> bool {
        self.scroll_y + self.viewport_height >= self.document_height
    }
}

/// A burst of child-list mutations observed on the host page.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Nodes added during the burst, in observation order.
    pub added: Vec<NodeId>,
}

impl MutationBatch {
    pub fn added(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            added: nodes.into_iter().collect(),
        }
    }
}

/// Read/write access to the host page.
///
/// Mutating methods on nodes that no longer exist are no-ops: the engine
/// degrades to "no outline shown" rather than disrupting the host page.
pub trait HostPage {
    /// The page's current location URL.
    fn location(&self) -> &str;

    /// First element in document order matching the selector.
    fn query(&self, selector: &str) -> Option<NodeId>;

    /// All descendants of `root` matching the selector, in document order.
    fn query_all_within(&self, root: NodeId, selector: &str) -> Vec<NodeId>;

    /// Element carrying the given id attribute, if attached to the document.
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Whether `node` lies inside `ancestor`'s subtree (or is `ancestor`).
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Lowercase tag name of the node.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Concatenated text content of the node's subtree.
    fn text_content(&self, node: NodeId) -> String;

    /// Create a detached element. It joins the document on `append_child`.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detach the node (and its subtree) from the document.
    fn remove(&mut self, node: NodeId);

    /// Set the node's id attribute.
    fn set_id(&mut self, node: NodeId, id: &str);

    /// Set an arbitrary attribute.
    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);

    /// Read an attribute.
    fn attr(&self, node: NodeId, name: &str) -> Option<&str>;

    /// Replace the node's own text.
    fn set_text(&mut self, node: NodeId, text: &str);

    /// Top of the node's bounding box relative to the viewport.
    fn bounding_top(&self, node: NodeId) -> Option<f64>;

    /// Rendered height of the node.
    fn client_height(&self, node: NodeId) -> f64;

    /// Force the node's rendered height (panel sizing).
    fn set_client_height(&mut self, node: NodeId, height: f64);

    /// Current scroll snapshot.
    fn scroll_state(&self) -> ScrollState;

    /// Scroll the document to the given vertical offset (clamped).
    fn scroll_to(&mut self, y: f64);
}

/// Subscription to the host page's child-list mutation bursts.
///
/// Dropping the receiver is the unsubscribe; at most one live subscription
/// is held per orchestrator.
pub trait MutationSource {
    fn subscribe(&self) -> broadcast::Receiver<MutationBatch>;
}

const MUTATION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct Node {
    tag: String,
    id: Option<String>,
    attrs: HashMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    doc_top: Option<f64>,
    height: f64,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            attrs: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            doc_top: None,
            height: 0.0,
        }
    }
}

/// In-memory host page: a node arena, a simple selector engine, emulated
/// geometry and scrolling, and a broadcast channel of mutation bursts.
///
/// Selector support covers what the engine's configuration needs: `#id`,
/// `.class`, bare tag names, the descendant combinator, and comma lists.
#[derive(Debug)]
pub struct MemoryPage {
    nodes: Vec<Node>,
    root: NodeId,
    location: String,
    scroll: ScrollState,
    mutations: broadcast::Sender<MutationBatch>,
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create an empty page with a `body` root element.
    pub fn new() -> Self {
        let (mutations, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        Self {
            nodes: vec![Node::new("body")],
            root: NodeId(0),
            location: String::new(),
            scroll: ScrollState {
                scroll_y: 0.0,
                viewport_height: 0.0,
                document_height: 0.0,
            },
            mutations,
        }
    }

    /// The root element every attached node descends from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_location(&mut self, url: &str) {
        self.location = url.to_string();
    }

    /// Set the viewport height and total document height.
    pub fn set_viewport(&mut self, viewport_height: f64, document_height: f64) {
        self.scroll.viewport_height = viewport_height;
        self.scroll.document_height = document_height;
    }

    /// Move the scroll position without clamping side effects of `scroll_to`.
    pub fn set_scroll_y(&mut self, y: f64) {
        self.scroll.scroll_y = y;
    }

    /// Place a node at a document-space vertical offset with a height.
    pub fn set_layout(&mut self, node: NodeId, doc_top: f64, height: f64) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.doc_top = Some(doc_top);
            n.height = height;
        }
    }

    /// Publish a synthetic mutation burst, as the host's own rendering would.
    pub fn emit_mutations(&self, batch: MutationBatch) {
        let _ = self.mutations.send(batch);
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    fn is_attached(&self, mut id: NodeId) -> bool {
        loop {
            if id == self.root {
                return true;
            }
            match self.node(id).and_then(|n| n.parent) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.nodes.get_mut(child.0 as usize) {
            c.parent = None;
        }
    }

    /// Preorder walk of the subtree rooted at `id`, including `id` itself.
    fn walk(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        if let Some(node) = self.node(id) {
            for &child in &node.children {
                self.walk(child, out);
            }
        }
    }

    fn matches_simple(&self, id: NodeId, part: &SelectorPart) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        match part {
            SelectorPart::Id(want) => node.id.as_deref() == Some(want.as_str()),
            SelectorPart::Class(want) => node
                .attrs
                .get("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == want)),
            SelectorPart::Tag(want) => node.tag == *want,
        }
    }

    /// Descendant-combinator match: the node matches the last part and the
    /// remaining parts match some ascending chain of ancestors.
    fn matches_chain(&self, id: NodeId, chain: &[SelectorPart]) -> bool {
        let Some((last, rest)) = chain.split_last() else {
            return false;
        };
        if !self.matches_simple(id, last) {
            return false;
        }
        let mut remaining = rest;
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(ancestor) = current {
            let Some((part, shorter)) = remaining.split_last() else {
                break;
            };
            if self.matches_simple(ancestor, part) {
                remaining = shorter;
            }
            current = self.node(ancestor).and_then(|n| n.parent);
        }
        remaining.is_empty()
    }

    fn matches(&self, id: NodeId, chains: &[Vec<SelectorPart>]) -> bool {
        chains.iter().any(|chain| self.matches_chain(id, chain))
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        if let Some(node) = self.node(id) {
            out.push_str(&node.text);
            for &child in &node.children {
                self.collect_text(child, out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum SelectorPart {
    Id(String),
    Class(String),
    Tag(String),
}

fn parse_selector(selector: &str) -> Vec<Vec<SelectorPart>> {
    selector
        .split(',')
        .filter_map(|chain| {
            let parts: Vec<SelectorPart> = chain
                .split_whitespace()
                .map(|part| {
                    if let Some(id) = part.strip_prefix('#') {
                        SelectorPart::Id(id.to_string())
                    } else if let Some(class) = part.strip_prefix('.') {
                        SelectorPart::Class(class.to_string())
                    } else {
                        SelectorPart::Tag(part.to_ascii_lowercase())
                    }
                })
                .collect();
            if parts.is_empty() { None } else { Some(parts) }
        })
        .collect()
}

impl HostPage for MemoryPage {
    fn location(&self) -> &str {
        &self.location
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        let chains = parse_selector(selector);
        let mut order = Vec::new();
        self.walk(self.root, &mut order);
        order
            .into_iter()
            .skip(1) // the root itself is not a query result
            .find(|&id| self.matches(id, &chains))
    }

    fn query_all_within(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        if self.node(root).is_none() {
            return Vec::new();
        }
        let chains = parse_selector(selector);
        let mut order = Vec::new();
        self.walk(root, &mut order);
        order
            .into_iter()
            .filter(|&id| id != root && self.matches(id, &chains))
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut order = Vec::new();
        self.walk(self.root, &mut order);
        order
            .into_iter()
            .find(|&n| self.node(n).is_some_and(|node| node.id.as_deref() == Some(id)))
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).and_then(|n| n.parent);
        }
        false
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(tag));
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() || parent == child {
            return;
        }
        self.detach(child);
        if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child.0 as usize) {
            c.parent = Some(parent);
        }
        if self.is_attached(parent) {
            let _ = self.mutations.send(MutationBatch::added([child]));
        }
    }

    fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.detach(node);
    }

    fn set_id(&mut self, node: NodeId, id: &str) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.id = Some(id.to_string());
        }
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)?.attrs.get(name).map(String::as_str)
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.text = text.to_string();
        }
    }

    fn bounding_top(&self, node: NodeId) -> Option<f64> {
        let doc_top = self.node(node)?.doc_top?;
        Some(doc_top - self.scroll.scroll_y)
    }

    fn client_height(&self, node: NodeId) -> f64 {
        self.node(node).map(|n| n.height).unwrap_or(0.0)
    }

    fn set_client_height(&mut self, node: NodeId, height: f64) {
        if let Some(n) = self.nodes.get_mut(node.0 as usize) {
            n.height = height;
        }
    }

    fn scroll_state(&self) -> ScrollState {
        self.scroll
    }

    fn scroll_to(&mut self, y: f64) {
        let max = (self.scroll.document_height - self.scroll.viewport_height).max(0.0);
        self.scroll.scroll_y = y.clamp(0.0, max);
    }
}

impl MutationSource for MemoryPage {
    fn subscribe(&self) -> broadcast::Receiver<MutationBatch> {
        self.mutations.subscribe()
    }
}
