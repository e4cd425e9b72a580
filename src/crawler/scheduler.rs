//! Worklist for the depth-first traversal
//!
//! This module handles:
//! - The explicit stack replacing recursion over listing pages
//! - Preserving document order across pages and files
//! - Batching consecutive files of one page for concurrent transfer

use std::path::PathBuf;
use url::Url;

/// A listing page scheduled for a visit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlNode {
    pub url: Url,

    /// Local folder the page's entries land in
    pub local_folder: PathBuf,

    /// 0 for the root listing
    pub depth: u32,
}

/// One unit of pending work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Visit a listing page
    Page {
        node: CrawlNode,
        /// Report index of the page it was found on
        parent: Option<usize>,
    },

    /// Transfer a file found on page `page`
    File {
        url: Url,
        folder: PathBuf,
        page: usize,
    },
}

/// LIFO worklist yielding items in depth-first document order
///
/// Children of a page are pushed in reverse so the first entry of the page is
/// popped first. A directory's whole subtree is therefore finished before the
/// next sibling entry, exactly like recursive descent.
#[derive(Debug, Default)]
pub struct Frontier {
    stack: Vec<WorkItem>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier seeded with the root page
    pub fn seeded(root: CrawlNode) -> Self {
        let mut frontier = Self::new();
        frontier.stack.push(WorkItem::Page {
            node: root,
            parent: None,
        });
        frontier
    }

    /// Schedules the entries of one page, preserving their order
    pub fn push_children(&mut self, items: Vec<WorkItem>) {
        self.stack.extend(items.into_iter().rev());
    }

    pub fn pop(&mut self) -> Option<WorkItem> {
        self.stack.pop()
    }

    /// Pops up to `max` consecutive file items belonging to `page`
    ///
    /// Stops at the first page item, so a subdirectory listed between two
    /// files is still visited between them.
    pub fn pop_file_batch(&mut self, page: usize, max: usize) -> Vec<(Url, PathBuf)> {
        let mut batch = Vec::new();
        while batch.len() < max {
            match self.stack.last() {
                Some(WorkItem::File { page: p, .. }) if *p == page => {}
                _ => break,
            }
            if let Some(WorkItem::File { url, folder, .. }) = self.stack.pop() {
                batch.push((url, folder));
            }
        }
        batch
    }

    /// Removes all pending work, yielding it in the order it would have run
    pub fn drain(&mut self) -> impl Iterator<Item = WorkItem> + '_ {
        self.stack.drain(..).rev()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
