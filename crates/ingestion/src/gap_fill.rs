//! Forward-filling of price gaps.

use tickseq_core::Bucket;

/// Replace every missing price with the nearest preceding price.
///
/// A leading run of missing prices stays missing. Volumes are untouched, so
/// filled buckets keep zero volume.
pub fn forward_fill(buckets: &mut [Bucket]) {
    let mut last_price: Option<f64> = None;
    for bucket in buckets.iter_mut() {
        match bucket.price {
            Some(price) => last_price = Some(price),
            None => bucket.price = last_price,
        }
    }
}

/// Remove the leading buckets that have no price.
///
/// Returns how many buckets were dropped.
pub fn drop_leading_gaps(buckets: &mut Vec<Bucket>) -> usize {
    let first_priced = buckets
        .iter()
        .position(|b| b.price.is_some())
        .unwrap_or(buckets.len());
    buckets.drain(..first_priced);
    first_priced
}
