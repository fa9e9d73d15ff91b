//! Content-change watching and the remount decision rule.
//!
//! The host replaces subtrees of its discussion container during its own
//! async rendering. The watcher holds the engine's single mutation
//! subscription and decides, per batch, whether a real content replacement
//! happened (remount) or the batch is churn the engine should ignore: its
//! own panel insertion being relocated, or mutations outside the observed
//! region entirely.

use tokio::sync::broadcast;
use tracing::debug;

use crate::host::{HostPage, MutationBatch, MutationSource, NodeId};

/// Verdict for one mutation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Real content replacement: tear down and remount.
    Remount,
    /// Engine-internal or irrelevant churn.
    Ignore,
}

/// The engine's single registered content watcher.
///
/// Dropping the watcher disconnects the subscription; the orchestrator
/// replaces its watcher slot wholesale on every mount cycle so at most one
/// subscription is ever live.
#[derive(Debug)]
pub struct ContentWatcher {
    observed: NodeId,
    own_root: NodeId,
    rx: broadcast::Receiver<MutationBatch>,
}

impl ContentWatcher {
    /// Subscribe to the host's mutation bursts, scoped to the container at
    /// `observed_selector`. Returns `None` when the container is absent
    /// (host structure changed or not yet loaded): registration is a no-op,
    /// never an error.
    pub fn register<H: HostPage + MutationSource>(
        host: &H,
        observed_selector: &str,
        own_root: NodeId,
    ) -> Option<Self> {
        let Some(observed) = host.query(observed_selector) else {
            debug!(selector = %observed_selector, "observed container absent, watcher not registered");
            return None;
        };
        Some(Self {
            observed,
            own_root,
            rx: host.subscribe(),
        })
    }

    /// Decide whether a batch represents a real content replacement.
    ///
    /// A batch is ignored when it has no added nodes, when none of the added
    /// nodes lie inside the observed container, or when every added node
    /// inside it belongs to the engine's own insertion point subtree.
    pub fn evaluate<H: HostPage>(&self, host: &H, batch: &MutationBatch) -> Verdict {
        let mut real_change = false;
        for &node in &batch.added {
            if !host.contains(self.observed, node) {
                continue;
            }
            if node == self.own_root || host.contains(self.own_root, node) {
                continue;
            }
            real_change = true;
            break;
        }
        if real_change {
            Verdict::Remount
        } else {
            Verdict::Ignore
        }
    }

    /// Receive the next mutation batch, skipping over lagged gaps. Returns
    /// `None` once the host side is gone.
    pub async fn recv(&mut self) -> Option<MutationBatch> {
        loop {
            match self.rx.recv().await {
                Ok(batch) => return Some(batch),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "mutation batches lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryPage;

    /// Page with an observed discussion container, a sidebar holding the
    /// engine's own insertion point, and one unrelated region.
    fn watch_page() -> (MemoryPage, NodeId, NodeId, NodeId) {
        let mut page = MemoryPage::new();
        let discussion = page.create_element("div");
        page.set_attr(discussion, "class", "js-discussion");
        page.append_child(page.root(), discussion);

        let own_root = page.create_element("div");
        page.set_id(own_root, "outline-root");
        page.append_child(discussion, own_root);

        let unrelated = page.create_element("div");
        page.append_child(page.root(), unrelated);

        (page, discussion, own_root, unrelated)
    }

    #[test]
    fn test_register_absent_container_is_noop() {
        let page = MemoryPage::new();
        let root = page.root();
        assert!(ContentWatcher::register(&page, ".js-discussion", root).is_none());
    }

    #[test]
    fn test_real_content_addition_triggers_remount() {
        let (mut page, discussion, own_root, _) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let comment = page.create_element("div");
        page.append_child(discussion, comment);
        let batch = MutationBatch::added([comment]);
        assert_eq!(watcher.evaluate(&page, &batch), Verdict::Remount);
    }

    #[test]
    fn test_own_panel_relocation_ignored() {
        let (page, _, own_root, _) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let batch = MutationBatch::added([own_root]);
        assert_eq!(watcher.evaluate(&page, &batch), Verdict::Ignore);
    }

    #[test]
    fn test_own_panel_children_ignored() {
        let (mut page, _, own_root, _) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let row = page.create_element("li");
        page.append_child(own_root, row);
        let batch = MutationBatch::added([own_root, row]);
        assert_eq!(watcher.evaluate(&page, &batch), Verdict::Ignore);
    }

    #[test]
    fn test_mutations_outside_observed_region_ignored() {
        let (mut page, _, own_root, unrelated) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let node = page.create_element("div");
        page.append_child(unrelated, node);
        let batch = MutationBatch::added([node]);
        assert_eq!(watcher.evaluate(&page, &batch), Verdict::Ignore);
    }

    #[test]
    fn test_empty_batch_ignored() {
        let (page, _, own_root, _) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();
        assert_eq!(watcher.evaluate(&page, &MutationBatch::default()), Verdict::Ignore);
    }

    #[test]
    fn test_mixed_batch_triggers_remount() {
        let (mut page, discussion, own_root, _) = watch_page();
        let watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let comment = page.create_element("div");
        page.append_child(discussion, comment);
        let batch = MutationBatch::added([own_root, comment]);
        assert_eq!(watcher.evaluate(&page, &batch), Verdict::Remount);
    }

    #[tokio::test]
    async fn test_recv_delivers_emitted_batches() {
        let (mut page, discussion, own_root, _) = watch_page();
        let mut watcher = ContentWatcher::register(&page, ".js-discussion", own_root).unwrap();

        let comment = page.create_element("div");
        page.append_child(discussion, comment);
        let batch = watcher.recv().await.unwrap();
        assert_eq!(batch.added, vec![comment]);
    }
}
