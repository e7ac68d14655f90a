use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{models::ListKind, tmdb::MAX_PAGES};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PageLink {
    Page { number: u32, current: bool },
    Gap,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pager {
    current: u32,
    total: u32,
}

impl Pager {
    /// `total_pages` from the listing; missing means a single page. Capped at
    /// what the provider will serve.
    pub fn new(current: u32, total_pages: Option<u32>) -> Self {
        let total = total_pages.unwrap_or(1).clamp(1, MAX_PAGES);
        Self { current: current.clamp(1, total), total }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Moves to `page` when it lies in `[1, total]`; otherwise nothing changes.
    pub fn go_to(&mut self, page: i64) -> bool {
        if page < 1 || page > i64::from(self.total) {
            return false;
        }
        self.current = page as u32;
        true
    }

    pub fn prev(&self) -> Option<u32> {
        (self.current > 1).then(|| self.current - 1)
    }

    pub fn next(&self) -> Option<u32> {
        (self.current < self.total).then(|| self.current + 1)
    }

    /// First, gap, previous, current, next, gap, last; each only when it adds
    /// a page not already shown.
    pub fn links(&self) -> Vec<PageLink> {
        let (c, t) = (self.current, self.total);
        let page = |number| PageLink::Page { number, current: number == c };

        let mut links = Vec::with_capacity(7);
        if c > 2 {
            links.push(page(1));
        }
        if c > 3 {
            links.push(PageLink::Gap);
        }
        if c > 1 {
            links.push(page(c - 1));
        }
        links.push(page(c));
        if c < t {
            links.push(page(c + 1));
        }
        if c + 2 < t {
            links.push(PageLink::Gap);
        }
        if c + 1 < t {
            links.push(page(t));
        }
        links
    }
}

/// The last pager each listing was rendered with for one browser session,
/// so a page past the known end is refused without asking the provider.
#[derive(Debug, Default)]
pub struct ListingPages {
    pagers: RwLock<HashMap<ListKind, Pager>>,
}

impl ListingPages {
    /// Before the first fetch only the provider cap is known.
    pub async fn get(&self, kind: ListKind) -> Pager {
        self.pagers
            .read()
            .await
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Pager::new(1, Some(MAX_PAGES)))
    }

    pub async fn set(&self, kind: ListKind, pager: Pager) {
        self.pagers.write().await.insert(kind, pager);
    }
}
