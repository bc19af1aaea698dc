//! In-memory channel catalog
//!
//! Holds every channel loaded so far together with the category filter
//! state, and derives the filtered, name-ordered view shown to the user.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::models::{Channel, GENERAL_CATEGORY};

/// Separator between multiple labels in one `group-title`
pub const CATEGORY_SEPARATOR: char = ';';

/// Reduce a raw category to the label used for grouping
///
/// In main-category-only mode `action;adventure` becomes `action`.
pub fn normalize_category(category: &str, main_category_only: bool) -> String {
    if main_category_only {
        category
            .split(CATEGORY_SEPARATOR)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    } else {
        category.trim().to_string()
    }
}

/// Case-insensitive name ordering with a case-sensitive tiebreak
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Default)]
pub struct ChannelCatalog {
    channels: Vec<Channel>,
    /// Category -> whether it is currently shown
    category_filters: BTreeMap<String, bool>,
    main_category_only: bool,
}

impl ChannelCatalog {
    pub fn new(main_category_only: bool) -> Self {
        Self {
            channels: Vec::new(),
            category_filters: BTreeMap::new(),
            main_category_only,
        }
    }

    /// Append channels and switch on any category seen for the first time
    pub fn add_channels(&mut self, channels: Vec<Channel>) {
        debug!("Adding {} channels to catalog", channels.len());
        self.channels.extend(channels);

        for category in self.categories() {
            self.category_filters.entry(category).or_insert(true);
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.category_filters.clear();
    }

    /// Grouping label of a channel, with absent categories mapped to `general`
    pub fn channel_category(&self, channel: &Channel) -> String {
        normalize_category(channel.category_or_general(), self.main_category_only)
    }

    /// Distinct grouping labels across all channels, sorted
    pub fn categories(&self) -> Vec<String> {
        self.channels
            .iter()
            .map(|channel| self.channel_category(channel))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Categories currently switched on, sorted
    pub fn active_categories(&self) -> Vec<String> {
        self.category_filters
            .iter()
            .filter(|(_, active)| **active)
            .map(|(category, _)| category.clone())
            .collect()
    }

    pub fn is_category_active(&self, category: &str) -> bool {
        self.category_filters.get(category).copied().unwrap_or(false)
    }

    /// Flip one category; unknown categories start from "off"
    pub fn toggle_category(&mut self, category: &str) {
        let active = self
            .category_filters
            .entry(category.to_string())
            .or_insert(false);
        *active = !*active;
    }

    /// Switch every known category on or off
    pub fn set_all_categories(&mut self, state: bool) {
        for active in self.category_filters.values_mut() {
            *active = state;
        }
    }

    /// Number of channels grouped under `category`
    pub fn category_channel_count(&self, category: &str) -> usize {
        self.channels
            .iter()
            .filter(|channel| self.channel_category(channel) == category)
            .count()
    }

    /// Channels passing the category set and free-text query, ordered by name
    ///
    /// An empty category set disables category filtering. The query is
    /// matched case-insensitively against name, raw category and country.
    pub fn filtered_channels<S: AsRef<str>>(
        &self,
        query: &str,
        active_categories: &[S],
    ) -> Vec<&Channel> {
        let query = query.trim().to_lowercase();
        // Stored categories are lower-cased, so user-supplied names are too
        let active_categories: Vec<String> = active_categories
            .iter()
            .map(|active| active.as_ref().trim().to_lowercase())
            .filter(|active| !active.is_empty())
            .collect();

        let mut filtered: Vec<&Channel> = self
            .channels
            .iter()
            .filter(|channel| {
                active_categories.is_empty() || {
                    let category = self.channel_category(channel);
                    active_categories.contains(&category)
                }
            })
            .filter(|channel| query.is_empty() || matches_query(channel, &query))
            .collect();

        // Stable: equal names keep insertion order
        filtered.sort_by(|a, b| compare_names(&a.name, &b.name));
        filtered
    }

    /// Filtered view using the catalog's own category filter state
    pub fn visible_channels(&self, query: &str) -> Vec<&Channel> {
        self.filtered_channels(query, &self.active_categories())
    }
}

fn matches_query(channel: &Channel, query: &str) -> bool {
    let contains = |field: Option<&str>| field.is_some_and(|value| value.to_lowercase().contains(query));

    contains(Some(channel.name.as_str()))
        || contains(channel.category.as_deref())
        || contains(channel.country.as_deref())
}
