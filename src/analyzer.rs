use chrono::{DateTime, Utc};
use rayon::prelude::*;
use statrs::statistics::Statistics as Summary;
use tracing::debug;

use crate::model::{ListingRecord, PriceAnalysis, PriceSource, Statistics, PLACEHOLDER_NAME};
use crate::stats::{average, median, price_distribution, remove_outliers, sanitize_price, DEFAULT_BUCKET_WIDTH};

// Suggest listing 5% under the median
pub const RECOMMENDED_RATIO: f64 = 0.95;

pub fn analyze(records: &[ListingRecord]) -> PriceAnalysis {
    analyze_at(records, Utc::now())
}

pub fn analyze_at(records: &[ListingRecord], now: DateTime<Utc>) -> PriceAnalysis {
    let Some(first) = records.first() else {
        return PriceAnalysis::empty(PLACEHOLDER_NAME, now);
    };
    let product_name = first.name.clone();

    let all_prices: Vec<f64> = records.iter().filter_map(|r| sanitize_price(r.price)).collect();
    let sold_prices: Vec<f64> = records
        .iter()
        .filter_map(|r| r.sold_price.and_then(sanitize_price))
        .collect();

    // Realised sales are ground truth; asking prices only stand in when nothing sold yet.
    let (population, source) = if !sold_prices.is_empty() {
        (&sold_prices, PriceSource::Sold)
    } else {
        (&all_prices, PriceSource::Asking)
    };

    if population.is_empty() {
        debug!(product = %product_name, records = records.len(), "no usable prices");
        return PriceAnalysis::empty(product_name, now);
    }

    let mut clean = remove_outliers(population);
    if clean.is_empty() {
        clean = population.clone();
    }
    let outliers_removed = population.len() - clean.len();

    let min = Summary::min(clean.iter());
    let max = Summary::max(clean.iter());
    let mid = median(&clean);

    debug!(
        product = %product_name,
        ?source,
        population = population.len(),
        outliers_removed,
        "analysed prices"
    );

    PriceAnalysis {
        product_name,
        analyzed_at: now,
        sold_prices,
        statistics: Statistics {
            min: min.round() as i64,
            max: max.round() as i64,
            average: average(&clean),
            median: mid.round() as i64,
            recommended_price: (mid * RECOMMENDED_RATIO).round() as i64,
        },
        price_distribution: price_distribution(&clean, DEFAULT_BUCKET_WIDTH),
        source,
        outliers_removed,
    }
}

pub fn analyze_batch(groups: &[(String, Vec<ListingRecord>)]) -> Vec<(String, PriceAnalysis)> {
    analyze_batch_at(groups, Utc::now())
}

// Groups are independent, one timestamp for the whole batch. Sorted by key.
pub fn analyze_batch_at(groups: &[(String, Vec<ListingRecord>)], now: DateTime<Utc>) -> Vec<(String, PriceAnalysis)> {
    let mut results: Vec<(String, PriceAnalysis)> = groups
        .par_iter()
        .map(|(key, records)| (key.clone(), analyze_at(records, now)))
        .collect();
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_come_from_clean_prices() {
        let records: Vec<_> = [3_000.0, 3_100.0, 3_200.0, 3_300.0, 3_400.0, 90_000.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| ListingRecord::sold(format!("m{i}"), "Camera", p))
            .collect();

        let a = analyze(&records);
        assert_eq!(a.statistics.min, 3_000);
        assert_eq!(a.statistics.max, 3_400);
        assert_eq!(a.outliers_removed, 1);
        assert_eq!(a.source, PriceSource::Sold);
        // the raw sold list keeps the outlier
        assert_eq!(a.sold_prices.len(), 6);
    }

    #[test]
    fn unsanitizable_prices_only() {
        let records = vec![
            ListingRecord::new("m1", "Broken", 0.0),
            ListingRecord::new("m2", "Broken", f64::NAN),
        ];
        let a = analyze(&records);
        assert_eq!(a.product_name, "Broken");
        assert_eq!(a.statistics, Statistics::default());
        assert!(a.price_distribution.is_empty());
        assert_eq!(a.source, PriceSource::None);
    }
}
