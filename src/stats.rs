use crate::model::PriceBucket;
use std::collections::BTreeMap;

// Below this is a placeholder listing, at or above MAX_PRICE a typo
pub const MIN_PRICE: f64 = 1_000.0;
pub const MAX_PRICE: f64 = 10_000_000.0;
pub const DEFAULT_BUCKET_WIDTH: f64 = 1_000.0;

pub fn sanitize_price(price: f64) -> Option<f64> {
    if price.is_finite() && (MIN_PRICE..MAX_PRICE).contains(&price) {
        Some(price)
    } else {
        None
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn median(values: &[f64]) -> f64 {
    match values.len() {
        0 => 0.0,
        1 => values[0],
        n => {
            let sorted = sorted_copy(values);
            let mid = n / 2;
            if n % 2 == 0 {
                (sorted[mid - 1] + sorted[mid]) / 2.0
            } else {
                sorted[mid]
            }
        }
    }
}

pub fn remove_outliers(values: &[f64]) -> Vec<f64> {
    // Too few points for quartiles to mean anything
    if values.len() < 4 {
        return values.to_vec();
    }

    // Index quartiles, no interpolation
    let sorted = sorted_copy(values);
    let n = sorted.len();
    let q1 = sorted[n / 4];
    let q3 = sorted[n * 3 / 4];
    let iqr = q3 - q1;

    let lower_bound = q1 - (1.5 * iqr);
    let upper_bound = q3 + (1.5 * iqr);

    let filtered: Vec<f64> = sorted
        .into_iter()
        .filter(|&p| p >= lower_bound && p <= upper_bound)
        .collect();

    // Return original if we filtered everything
    if filtered.is_empty() {
        values.to_vec()
    } else {
        filtered
    }
}

pub fn average(values: &[f64]) -> i64 {
    // Re-check bounds, callers may pass unsanitized data
    let valid: Vec<f64> = values.iter().copied().filter_map(sanitize_price).collect();
    if valid.is_empty() {
        return 0;
    }

    let sum: f64 = valid.iter().sum();
    if !sum.is_finite() {
        return 0;
    }

    (sum / valid.len() as f64).round() as i64
}

pub fn price_distribution(values: &[f64], bucket_width: f64) -> Vec<PriceBucket> {
    if !(bucket_width.is_finite() && bucket_width > 0.0) {
        return Vec::new();
    }

    // f64 is not Ord, but bucket bounds are whole multiples of the width so
    // the integer key is exact.
    let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();

    for &value in values {
        if !value.is_finite() {
            continue;
        }
        let bound = (value / bucket_width).floor() as i64;
        *buckets.entry(bound).or_default() += 1;
    }

    buckets
        .into_iter()
        .map(|(bound, count)| PriceBucket {
            price: bound as f64 * bucket_width,
            count,
        })
        .collect()
}
