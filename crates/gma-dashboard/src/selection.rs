//! Selection, sorting and search over the fetched video list.
//!
//! # Design
//! - The fetched list keeps backend order; sorting and search only shape the
//!   view returned by [`VideoSelection::visible`].
//! - Aggregates are recomputed from `selected ∩ list` on every call.
//! - Replacing the list prunes selected ids that no longer exist.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use gma_api_models::VideoRecord;
use thiserror::Error;

/// Ordering applied to the visible list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Case-insensitive filename order.
    #[default]
    Name,
    /// Ascending file size.
    Size,
}

/// Unknown sort key label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key")]
pub struct UnknownSortKey {
    /// Label that failed to parse.
    pub label: String,
}

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            _ => Err(UnknownSortKey {
                label: value.to_string(),
            }),
        }
    }
}

/// Selection state for one screen's video list.
#[derive(Debug, Clone, Default)]
pub struct VideoSelection {
    videos: Vec<VideoRecord>,
    selected: BTreeSet<i64>,
    sort: SortKey,
    search: String,
}

impl VideoSelection {
    /// Empty selection over an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the fetched list, pruning selected ids that disappeared.
    pub fn replace_list(&mut self, videos: Vec<VideoRecord>) {
        self.videos = videos;
        let present: BTreeSet<i64> = self.videos.iter().map(|video| video.id).collect();
        self.selected.retain(|id| present.contains(id));
    }

    /// Flip membership of `id`. Unknown ids are ignored. Returns whether the
    /// id is selected afterwards.
    pub fn toggle(&mut self, id: i64) -> bool {
        if !self.videos.iter().any(|video| video.id == id) {
            return false;
        }
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// Change the ordering of the visible list.
    pub const fn set_sort(&mut self, key: SortKey) {
        self.sort = key;
    }

    /// Current sort key.
    #[must_use]
    pub const fn sort(&self) -> SortKey {
        self.sort
    }

    /// Filter the visible list by a case-insensitive filename substring.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    /// Select every visible video, or clear the selection when every visible
    /// video is already selected.
    pub fn select_all_or_clear(&mut self) {
        let visible: Vec<i64> = self.visible().iter().map(|video| video.id).collect();
        if !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id)) {
            self.selected.clear();
        } else {
            self.selected.extend(visible);
        }
    }

    /// Drop every selected id.
    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Search-filtered, sorted view of the fetched list.
    #[must_use]
    pub fn visible(&self) -> Vec<&VideoRecord> {
        let needle = self.search.trim().to_lowercase();
        let mut view: Vec<&VideoRecord> = self
            .videos
            .iter()
            .filter(|video| {
                needle.is_empty() || video.display_name().to_lowercase().contains(&needle)
            })
            .collect();
        match self.sort {
            SortKey::Name => view.sort_by(|a, b| compare_names(a, b)),
            SortKey::Size => view.sort_by(|a, b| {
                a.file_size
                    .cmp(&b.file_size)
                    .then_with(|| compare_names(a, b))
            }),
        }
        view
    }

    /// Whether `id` is selected.
    #[must_use]
    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    /// Number of selected videos present in the list.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected_videos().count()
    }

    /// Combined size in bytes of the selected videos.
    #[must_use]
    pub fn total_selected_size(&self) -> u64 {
        self.selected_videos().map(|video| video.file_size).sum()
    }

    /// Selected ids in fetched-list order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<i64> {
        self.selected_videos().map(|video| video.id).collect()
    }

    /// The fetched list, in backend order.
    #[must_use]
    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    fn selected_videos(&self) -> impl Iterator<Item = &VideoRecord> {
        self.videos
            .iter()
            .filter(|video| self.selected.contains(&video.id))
    }
}

fn compare_names(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    a.display_name()
        .to_lowercase()
        .cmp(&b.display_name().to_lowercase())
        .then_with(|| a.display_name().cmp(b.display_name()))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fakes::video;

    fn sample() -> Vec<VideoRecord> {
        vec![
            video(3, "charlie.mp4", 300),
            video(1, "Alpha.mov", 900),
            video(2, "bravo.mp4", 100),
            video(4, "alpha-2.mp4", 100),
        ]
    }

    fn ids(view: &[&VideoRecord]) -> Vec<i64> {
        view.iter().map(|video| video.id).collect()
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        assert_eq!(ids(&selection.visible()), vec![4, 1, 2, 3]);
    }

    #[test]
    fn size_sort_is_numeric_ascending() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        selection.set_sort(SortKey::Size);
        assert_eq!(ids(&selection.visible()), vec![4, 2, 3, 1]);
    }

    #[test]
    fn sorting_twice_matches_sorting_once_and_keeps_fetched_order() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        for key in [SortKey::Name, SortKey::Size] {
            selection.set_sort(key);
            let once = ids(&selection.visible());
            selection.set_sort(key);
            assert_eq!(ids(&selection.visible()), once);
        }
        let fetched: Vec<i64> = selection.videos().iter().map(|video| video.id).collect();
        assert_eq!(fetched, vec![3, 1, 2, 4]);
    }

    #[test]
    fn refresh_prunes_stale_selection() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        selection.toggle(1);
        selection.toggle(3);
        selection.replace_list(vec![video(3, "charlie.mp4", 300), video(9, "new.mp4", 5)]);
        assert_eq!(selection.selected_ids(), vec![3]);
        assert!(!selection.is_selected(1));
        assert_eq!(selection.selected_count(), 1);
    }

    #[test]
    fn toggle_flips_membership_and_ignores_unknown_ids() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        assert!(selection.toggle(2));
        assert!(!selection.toggle(2));
        assert!(!selection.toggle(404));
        assert_eq!(selection.selected_count(), 0);
    }

    #[test]
    fn aggregates_follow_the_selection() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        selection.toggle(1);
        selection.toggle(2);
        assert_eq!(selection.selected_count(), 2);
        assert_eq!(selection.total_selected_size(), 1_000);
        assert_eq!(selection.selected_ids(), vec![1, 2]);
    }

    #[test]
    fn search_filters_visible_list_case_insensitively() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        selection.set_search("ALPHA");
        assert_eq!(ids(&selection.visible()), vec![4, 1]);
        selection.set_search("zzz");
        assert!(selection.visible().is_empty());
    }

    #[test]
    fn select_all_toggles_over_visible_ids() {
        let mut selection = VideoSelection::new();
        selection.replace_list(sample());
        selection.set_search("alpha");
        selection.select_all_or_clear();
        assert_eq!(selection.selected_ids(), vec![1, 4]);
        selection.select_all_or_clear();
        assert_eq!(selection.selected_count(), 0);

        selection.set_search("");
        selection.toggle(2);
        selection.select_all_or_clear();
        assert_eq!(selection.selected_count(), 4);
    }

    #[test]
    fn sort_key_parses_from_labels() {
        assert_eq!("Size".parse::<SortKey>(), Ok(SortKey::Size));
        assert!("date".parse::<SortKey>().is_err());
    }
}
