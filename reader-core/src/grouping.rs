use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{ItemEvent, ItemUpdate};
use crate::models::{ItemId, ItemState, NewsItem};

/// The active partition function applied to a cache snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMode {
    Date,
    State,
    Author,
    Category,
    Topic,
    Label,
    Rating,
    Feed,
    Stickiness,
}

/// A named bucket of news items. Produced fresh on every grouping pass,
/// never persisted. Ids are unique within one pass only.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    pub id: u32,
    pub label: String,
    /// Icon key for the UI, present for the fixed bucket sets.
    pub icon: Option<&'static str>,
    pub items: Vec<NewsItem>,
}

const DATE_BUCKETS: [(&str, Option<&'static str>); 5] = [
    ("Today", Some("today")),
    ("Yesterday", Some("yesterday")),
    ("Earlier this Week", Some("week")),
    ("Last Week", Some("last-week")),
    ("Older", Some("older")),
];

const STATE_BUCKETS: [(&str, Option<&'static str>); 4] = [
    ("New", Some("new")),
    ("Updated", Some("updated")),
    ("Unread", Some("unread")),
    ("Read", Some("read")),
];

const RATING_BUCKETS: [(&str, Option<&'static str>); 5] = [
    ("Excellent", Some("rating-4")),
    ("Good", Some("rating-3")),
    ("Average", Some("rating-2")),
    ("Poor", Some("rating-1")),
    ("Unrated", Some("rating-0")),
];

const STICKY_BUCKETS: [(&str, Option<&'static str>); 2] = [
    ("Sticky", Some("sticky")),
    ("Not Sticky", Some("not-sticky")),
];

/// Partition `items` according to `mode`.
///
/// Deterministic: bucket membership depends only on the input, bucket order
/// follows a fixed enumeration per mode (constant order for the fixed
/// bucket sets, sorted keys for the string/feed keyed modes, with the
/// unclassified bucket last). Empty buckets are omitted. Every item lands
/// in exactly one bucket.
pub fn group(mode: GroupingMode, items: &[NewsItem], now: DateTime<Utc>) -> Vec<EntityGroup> {
    match mode {
        GroupingMode::Date => fixed_buckets(&DATE_BUCKETS, items, |item| {
            date_bucket(item.relevant_date().date_naive(), now.date_naive())
        }),
        GroupingMode::State => fixed_buckets(&STATE_BUCKETS, items, |item| match item.state {
            ItemState::New => 0,
            ItemState::Updated => 1,
            ItemState::Unread => 2,
            _ => 3,
        }),
        GroupingMode::Rating => fixed_buckets(&RATING_BUCKETS, items, |item| match item.rating {
            r if r >= 80 => 0,
            r if r >= 60 => 1,
            r if r >= 40 => 2,
            r if r >= 20 => 3,
            _ => 4,
        }),
        GroupingMode::Stickiness => {
            fixed_buckets(&STICKY_BUCKETS, items, |item| usize::from(!item.sticky))
        }
        GroupingMode::Author => keyed_buckets(items, |item| item.author.clone(), "Unknown"),
        GroupingMode::Category => keyed_buckets(items, |item| item.category.clone(), "Unknown"),
        GroupingMode::Label => keyed_buckets(
            items,
            |item| item.labels.iter().min().cloned(),
            "None",
        ),
        GroupingMode::Topic => topic_buckets(items),
        GroupingMode::Feed => feed_buckets(items),
    }
}

/// Decide whether the active mode needs a full regroup for `event`.
///
/// Items appearing or disappearing always regroup, as does any visibility
/// flip. Plain updates only regroup when the field the mode keys on
/// actually changed.
pub fn needs_regroup(mode: GroupingMode, event: &ItemEvent) -> bool {
    match event {
        ItemEvent::Added(items) | ItemEvent::Removed(items) => !items.is_empty(),
        ItemEvent::Updated(updates) => updates.iter().any(|update| update_affects(mode, update)),
    }
}

fn update_affects(mode: GroupingMode, update: &ItemUpdate) -> bool {
    let (old, new) = (&update.previous, &update.current);
    if old.is_visible() != new.is_visible() {
        return true;
    }
    match mode {
        GroupingMode::Date => old.relevant_date() != new.relevant_date(),
        GroupingMode::State => old.state != new.state,
        GroupingMode::Author => old.author != new.author,
        GroupingMode::Category => old.category != new.category,
        GroupingMode::Topic => old.in_reply_to != new.in_reply_to || old.title != new.title,
        GroupingMode::Label => old.labels != new.labels,
        GroupingMode::Rating => old.rating != new.rating,
        GroupingMode::Feed => old.feed.id != new.feed.id,
        GroupingMode::Stickiness => old.sticky != new.sticky,
    }
}

fn date_bucket(date: NaiveDate, today: NaiveDate) -> usize {
    if date >= today {
        0
    } else if Some(date) == today.pred_opt() {
        1
    } else if date.iso_week() == today.iso_week() {
        2
    } else if date.iso_week() == (today - Duration::days(7)).iso_week() {
        3
    } else {
        4
    }
}

fn fixed_buckets(
    defs: &[(&'static str, Option<&'static str>)],
    items: &[NewsItem],
    bucket_of: impl Fn(&NewsItem) -> usize,
) -> Vec<EntityGroup> {
    let mut buckets: Vec<Vec<NewsItem>> = vec![Vec::new(); defs.len()];
    for item in items {
        buckets[bucket_of(item)].push(item.clone());
    }
    defs.iter()
        .enumerate()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|((id, (label, icon)), bucket)| EntityGroup {
            id: id as u32,
            label: (*label).to_string(),
            icon: *icon,
            items: bucket,
        })
        .collect()
}

struct KeyedBucket {
    label: String,
    // smallest item id seen for this key, so the display label does not
    // depend on input order
    label_source: ItemId,
    items: Vec<NewsItem>,
}

fn keyed_buckets(
    items: &[NewsItem],
    key_of: impl Fn(&NewsItem) -> Option<String>,
    unclassified_label: &str,
) -> Vec<EntityGroup> {
    let mut keyed: BTreeMap<String, KeyedBucket> = BTreeMap::new();
    let mut unclassified: Vec<NewsItem> = Vec::new();

    for item in items {
        let raw = key_of(item)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        match raw {
            Some(raw) => {
                let bucket = keyed
                    .entry(raw.to_lowercase())
                    .or_insert_with(|| KeyedBucket {
                        label: raw.clone(),
                        label_source: item.id,
                        items: Vec::new(),
                    });
                if item.id < bucket.label_source {
                    bucket.label = raw;
                    bucket.label_source = item.id;
                }
                bucket.items.push(item.clone());
            }
            None => unclassified.push(item.clone()),
        }
    }

    finish_keyed(keyed.into_values().collect(), unclassified, unclassified_label)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum TopicKey {
    Reply(ItemId),
    Title(String),
}

fn topic_buckets(items: &[NewsItem]) -> Vec<EntityGroup> {
    let mut keyed: BTreeMap<TopicKey, KeyedBucket> = BTreeMap::new();
    let mut unclassified: Vec<NewsItem> = Vec::new();

    for item in items {
        let key = match item.in_reply_to {
            Some(parent) => Some((TopicKey::Reply(parent), stripped_title(&item.title))),
            None => {
                let title = stripped_title(&item.title);
                (!title.is_empty()).then(|| (TopicKey::Title(title.to_lowercase()), title))
            }
        };
        match key {
            Some((key, display)) => {
                let bucket = keyed.entry(key).or_insert_with(|| KeyedBucket {
                    label: display.clone(),
                    label_source: item.id,
                    items: Vec::new(),
                });
                if item.id < bucket.label_source && !display.is_empty() {
                    bucket.label = display;
                    bucket.label_source = item.id;
                }
                bucket.items.push(item.clone());
            }
            None => unclassified.push(item.clone()),
        }
    }

    finish_keyed(keyed.into_values().collect(), unclassified, "No Topic")
}

fn feed_buckets(items: &[NewsItem]) -> Vec<EntityGroup> {
    let mut keyed: BTreeMap<u64, (String, Vec<NewsItem>)> = BTreeMap::new();
    for item in items {
        let label = item
            .feed
            .title
            .clone()
            .unwrap_or_else(|| item.feed.link.clone());
        keyed
            .entry(item.feed.id)
            .or_insert_with(|| (label, Vec::new()))
            .1
            .push(item.clone());
    }
    keyed
        .into_values()
        .enumerate()
        .map(|(id, (label, bucket))| EntityGroup {
            id: id as u32,
            label,
            icon: None,
            items: bucket,
        })
        .collect()
}

fn finish_keyed(
    buckets: Vec<KeyedBucket>,
    unclassified: Vec<NewsItem>,
    unclassified_label: &str,
) -> Vec<EntityGroup> {
    let mut groups: Vec<EntityGroup> = buckets
        .into_iter()
        .enumerate()
        .map(|(id, bucket)| EntityGroup {
            id: id as u32,
            label: bucket.label,
            icon: None,
            items: bucket.items,
        })
        .collect();
    if !unclassified.is_empty() {
        groups.push(EntityGroup {
            id: groups.len() as u32,
            label: unclassified_label.to_string(),
            icon: None,
            items: unclassified,
        });
    }
    groups
}

/// Topic key: the title with any leading "Re:" chain removed.
fn stripped_title(title: &str) -> String {
    let mut rest = title.trim();
    while rest
        .get(..3)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        rest = rest[3..].trim_start();
    }
    rest.to_string()
}
