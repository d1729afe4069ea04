use rust_decimal::Decimal;

/// Ascending inclusive upper bounds with one label per bucket, plus a
/// trailing overflow label.
///
/// `labels.len()` is always `upper_bounds.len() + 1`, so every value lands
/// in exactly one bucket.
#[derive(Debug, Clone, Copy)]
pub struct BucketSet {
    upper_bounds: &'static [i64],
    labels: &'static [&'static str],
}

/// Nightly price ranges
pub const PRICE_RANGES: BucketSet = BucketSet::new(
    &[50, 100, 200, 500],
    &["$0-50", "$51-100", "$101-200", "$201-500", "$500+"],
);

/// Cumulative review count ranges
pub const REVIEW_RANGES: BucketSet = BucketSet::new(
    &[0, 10, 50, 100],
    &[
        "0 reviews",
        "1-10 reviews",
        "11-50 reviews",
        "51-100 reviews",
        "100+ reviews",
    ],
);

/// Host categories by distinct listing count
pub const HOST_CATEGORIES: BucketSet = BucketSet::new(
    &[1, 5, 10],
    &["Single Listing", "2-5 Listings", "6-10 Listings", "11+ Listings"],
);

/// Finer host ranges by distinct listing count
pub const HOST_LISTING_RANGES: BucketSet = BucketSet::new(
    &[1, 3, 5, 10],
    &[
        "1 listing",
        "2-3 listings",
        "4-5 listings",
        "6-10 listings",
        "11+ listings",
    ],
);

impl BucketSet {
    pub const fn new(upper_bounds: &'static [i64], labels: &'static [&'static str]) -> Self {
        assert!(labels.len() == upper_bounds.len() + 1);
        Self {
            upper_bounds,
            labels,
        }
    }

    /// Number of buckets, overflow included
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the first bucket whose bound is >= `value`, or the overflow bucket
    pub fn index_of(&self, value: Decimal) -> usize {
        self.upper_bounds
            .iter()
            .position(|bound| value <= Decimal::from(*bound))
            .unwrap_or(self.upper_bounds.len())
    }

    pub fn label(&self, index: usize) -> &'static str {
        self.labels[index]
    }

    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }
}
