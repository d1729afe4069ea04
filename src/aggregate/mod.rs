//! Aggregation primitives shared by every analytical query.
//!
//! All functions are pure: given the same rows in the same order they return
//! the same output. Groups are reported in first-seen order so that ties in
//! later (stable) sorts resolve by insertion order.

pub mod buckets;

pub use buckets::{BucketSet, HOST_CATEGORIES, HOST_LISTING_RANGES, PRICE_RANGES, REVIEW_RANGES};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Rounding applied to a computed mean
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Nearest integer, halves away from zero
    Integer,
    /// Fixed number of decimal places
    Decimals(u32),
    /// No rounding
    Exact,
}

impl Precision {
    pub fn apply(self, value: Decimal) -> Decimal {
        match self {
            Precision::Integer => round_half_up(value, 0),
            Precision::Decimals(dp) => round_half_up(value, dp),
            Precision::Exact => value,
        }
    }
}

/// Round half away from zero, like SQL `ROUND` (not banker's rounding)
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Insertion-ordered grouping accumulator
#[derive(Debug, Clone)]
pub struct GroupBy<K, A> {
    index: HashMap<K, usize>,
    groups: Vec<(K, A)>,
}

impl<K: Eq + Hash + Clone, A: Default> GroupBy<K, A> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Accumulator for `key`, created on first sight
    pub fn entry(&mut self, key: K) -> &mut A {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.groups.push((key.clone(), A::default()));
                self.index.insert(key, self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        &mut self.groups[position].1
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_vec(self) -> Vec<(K, A)> {
        self.groups
    }
}

impl<K: Eq + Hash + Clone, A: Default> Default for GroupBy<K, A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running arithmetic mean over present values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    sum: Decimal,
    count: u64,
}

impl Mean {
    pub fn push(&mut self, value: Decimal) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> Decimal {
        self.sum
    }

    /// `None` when no value was pushed
    pub fn value(&self) -> Option<Decimal> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / Decimal::from(self.count))
        }
    }
}

/// Mean of `value` per group.
///
/// Rows with no group key, or with an absent value, are skipped entirely:
/// an absent value counts toward neither the sum nor the count. A group with
/// no present values does not appear in the output.
pub fn group_average<T, K>(
    rows: &[T],
    group_key: impl Fn(&T) -> Option<K>,
    value: impl Fn(&T) -> Option<Decimal>,
    precision: Precision,
) -> Vec<(K, Decimal)>
where
    K: Eq + Hash + Clone,
{
    let mut groups: GroupBy<K, Mean> = GroupBy::new();
    for row in rows {
        if let (Some(key), Some(v)) = (group_key(row), value(row)) {
            groups.entry(key).push(v);
        }
    }

    groups
        .into_vec()
        .into_iter()
        .filter_map(|(key, mean)| mean.value().map(|avg| (key, precision.apply(avg))))
        .collect()
}

/// Sum of `value` per group. Groups with no present values are absent.
pub fn group_sum<T, K>(
    rows: &[T],
    group_key: impl Fn(&T) -> Option<K>,
    value: impl Fn(&T) -> Option<Decimal>,
) -> Vec<(K, Decimal)>
where
    K: Eq + Hash + Clone,
{
    let mut groups: GroupBy<K, Mean> = GroupBy::new();
    for row in rows {
        if let (Some(key), Some(v)) = (group_key(row), value(row)) {
            groups.entry(key).push(v);
        }
    }

    groups
        .into_vec()
        .into_iter()
        .map(|(key, acc)| (key, acc.sum()))
        .collect()
}

/// Number of distinct `member` values per group
pub fn group_distinct_count<T, K, D>(
    rows: &[T],
    group_key: impl Fn(&T) -> Option<K>,
    member: impl Fn(&T) -> Option<D>,
) -> Vec<(K, u64)>
where
    K: Eq + Hash + Clone,
    D: Eq + Hash,
{
    let mut groups: GroupBy<K, HashSet<D>> = GroupBy::new();
    for row in rows {
        if let (Some(key), Some(m)) = (group_key(row), member(row)) {
            groups.entry(key).insert(m);
        }
    }

    groups
        .into_vec()
        .into_iter()
        .map(|(key, members)| (key, members.len() as u64))
        .collect()
}

/// Label of the bucket `value` falls into
pub fn bucketize(value: Decimal, buckets: &BucketSet) -> &'static str {
    buckets.label(buckets.index_of(value))
}

/// Row count per bucket, in bucket order, zero-count buckets included.
/// Rows whose value is absent are not counted.
pub fn bucket_counts<T>(
    rows: &[T],
    value: impl Fn(&T) -> Option<Decimal>,
    buckets: &BucketSet,
) -> Vec<(&'static str, u64)> {
    let mut counts = vec![0u64; buckets.len()];
    for v in rows.iter().filter_map(&value) {
        counts[buckets.index_of(v)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| (buckets.label(i), count))
        .collect()
}

/// `round(count * 100 / total)`, or 0 when `total` is 0
pub fn percentage_of_total(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = Decimal::from(count) * Decimal::ONE_HUNDRED / Decimal::from(total);
    round_half_up(pct, 0).to_u32().unwrap_or(u32::MAX)
}

/// Keep the first `n` items by descending `rank`. Equal ranks keep their
/// input order.
pub fn top_n<T, R: Ord>(mut items: Vec<T>, rank: impl Fn(&T) -> R, n: usize) -> Vec<T> {
    items.sort_by(|a, b| rank(b).cmp(&rank(a)));
    items.truncate(n);
    items
}

/// Like [`top_n`], but equal ranks are ordered by ascending `tie_break`
pub fn top_n_with_tie_break<T, R: Ord, B: Ord>(
    mut items: Vec<T>,
    rank: impl Fn(&T) -> R,
    tie_break: impl Fn(&T) -> B,
    n: usize,
) -> Vec<T> {
    items.sort_by(|a, b| match rank(b).cmp(&rank(a)) {
        Ordering::Equal => tie_break(a).cmp(&tie_break(b)),
        other => other,
    });
    items.truncate(n);
    items
}

/// Drop groups that fail `predicate`
pub fn having_filter<G>(groups: Vec<G>, predicate: impl Fn(&G) -> bool) -> Vec<G> {
    groups.into_iter().filter(|g| predicate(g)).collect()
}

/// Predicate for [`having_filter`]: the group holds at least `min` members
pub fn at_least(min: u64) -> impl Fn(&u64) -> bool {
    move |count| *count >= min
}
