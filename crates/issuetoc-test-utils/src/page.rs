//! Builder for host pages shaped like the issue page the default
//! configuration targets.

use issuetoc_core::{HostPage, MemoryPage};

/// Location used by the built page unless overridden.
pub const ISSUE_URL: &str = "https://github.com/acme/widgets/issues/42";

/// Builds a [`MemoryPage`] whose structure matches the default selector
/// configuration: a `#discussion_bucket` layout region holding a
/// `#partial-discussion-sidebar` and a `.js-discussion` container, with the
/// indexed content under `.edit-comment-hide .markdown-body`.
#[derive(Debug)]
pub struct IssuePageBuilder {
    location: String,
    viewport_height: f64,
    document_height: f64,
    region_height: f64,
    sidebar_height: f64,
    headings: Vec<(u8, String, f64)>,
    content_container: bool,
}

impl Default for IssuePageBuilder {
    fn default() -> Self {
        Self {
            location: ISSUE_URL.to_string(),
            viewport_height: 800.0,
            document_height: 2000.0,
            region_height: 1500.0,
            sidebar_height: 400.0,
            headings: Vec::new(),
            content_container: true,
        }
    }
}

impl IssuePageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(mut self, url: &str) -> Self {
        self.location = url.to_string();
        self
    }

    pub fn viewport(mut self, viewport_height: f64, document_height: f64) -> Self {
        self.viewport_height = viewport_height;
        self.document_height = document_height;
        self
    }

    pub fn region_height(mut self, height: f64) -> Self {
        self.region_height = height;
        self
    }

    pub fn sidebar_height(mut self, height: f64) -> Self {
        self.sidebar_height = height;
        self
    }

    /// Add a heading of the given level at a document-space vertical offset.
    pub fn heading(mut self, level: u8, text: &str, doc_top: f64) -> Self {
        self.headings.push((level, text.to_string(), doc_top));
        self
    }

    /// Build a page without the content container, as when the host's
    /// structure changed or the content has not rendered yet.
    pub fn without_content_container(mut self) -> Self {
        self.content_container = false;
        self
    }

    pub fn build(self) -> MemoryPage {
        let mut page = MemoryPage::new();
        page.set_location(&self.location);
        page.set_viewport(self.viewport_height, self.document_height);

        let bucket = page.create_element("div");
        page.set_id(bucket, "discussion_bucket");
        page.append_child(page.root(), bucket);
        page.set_layout(bucket, 0.0, self.region_height);

        let sidebar = page.create_element("div");
        page.set_id(sidebar, "partial-discussion-sidebar");
        page.append_child(bucket, sidebar);
        page.set_layout(sidebar, 0.0, self.sidebar_height);

        let discussion = page.create_element("div");
        page.set_attr(discussion, "class", "js-discussion");
        page.append_child(bucket, discussion);

        if self.content_container {
            let wrapper = page.create_element("div");
            page.set_attr(wrapper, "class", "edit-comment-hide");
            page.append_child(discussion, wrapper);

            let body = page.create_element("div");
            page.set_attr(body, "class", "markdown-body");
            page.append_child(wrapper, body);

            for (level, text, doc_top) in &self.headings {
                let heading = page.create_element(&format!("h{level}"));
                page.set_text(heading, text);
                page.append_child(body, heading);
                page.set_layout(heading, *doc_top, 30.0);
            }
        }

        page
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuetoc_config::SelectorsConfig;

    #[test]
    fn test_built_page_matches_default_selectors() {
        let page = IssuePageBuilder::new()
            .heading(1, "Intro", 100.0)
            .heading(2, "Setup", 600.0)
            .build();
        let selectors = SelectorsConfig::default();

        assert!(page.query(&selectors.layout_region).is_some());
        assert!(page.query(&selectors.sidebar_region).is_some());
        assert!(page.query(&selectors.observed_container).is_some());
        let container = page.query(&selectors.content_container).unwrap();
        assert_eq!(page.query_all_within(container, "h1, h2").len(), 2);
        assert_eq!(page.location(), ISSUE_URL);
    }

    #[test]
    fn test_without_content_container() {
        let page = IssuePageBuilder::new().without_content_container().build();
        let selectors = SelectorsConfig::default();
        assert!(page.query(&selectors.content_container).is_none());
        assert!(page.query(&selectors.observed_container).is_some());
    }
}
