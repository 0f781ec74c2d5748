use std::collections::HashSet;

use crate::models::automation::JobPosting;

/// Postings the user picked, keyed by `apply_url`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    urls: HashSet<String>,
}

impl SelectionSet {
    /// Flips `apply_url` in or out; returns whether it is now selected.
    pub fn toggle(&mut self, apply_url: &str) -> bool {
        if self.urls.remove(apply_url) {
            false
        } else {
            self.urls.insert(apply_url.to_string());
            true
        }
    }

    pub fn select_all(&mut self, postings: &[JobPosting]) {
        self.urls = postings.iter().map(|p| p.apply_url.clone()).collect();
    }

    pub fn clear(&mut self) {
        self.urls.clear();
    }

    pub fn contains(&self, apply_url: &str) -> bool {
        self.urls.contains(apply_url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Selected postings in search-result order, each URL once.
    pub fn freeze(&self, postings: &[JobPosting]) -> Vec<JobPosting> {
        let mut seen = HashSet::with_capacity(self.urls.len());
        postings
            .iter()
            .filter(|p| self.contains(&p.apply_url) && seen.insert(p.apply_url.as_str()))
            .cloned()
            .collect()
    }

    /// Selected URLs in search-result order.
    pub fn ordered_urls(&self, postings: &[JobPosting]) -> Vec<String> {
        self.freeze(postings)
            .into_iter()
            .map(|p| p.apply_url)
            .collect()
    }
}
