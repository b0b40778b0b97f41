use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::analyzer::{analyze_at, analyze_batch_at};
use crate::error::Result;
use crate::model::{ListingRecord, PriceAnalysis};

pub const DEFAULT_TTL_HOURS: i64 = 24;

// Stale entries read as absent and are evicted on the way
pub trait AnalysisCache {
    fn get(&mut self, product_name: &str, now: DateTime<Utc>) -> Result<Option<PriceAnalysis>>;
    fn put(&mut self, product_name: &str, analysis: &PriceAnalysis) -> Result<()>;
}

fn is_expired(analysis: &PriceAnalysis, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
    now - analysis.analyzed_at > ttl
}

fn timestamp(t: DateTime<Utc>) -> String {
    // fixed width so the column sorts as text
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct SqliteCache {
    conn: Connection,
    ttl: TimeDelta,
}

impl SqliteCache {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS price_analyses (
                product_name TEXT PRIMARY KEY,
                analyzed_at  TEXT NOT NULL,
                payload      TEXT NOT NULL
             )",
        )?;
        Ok(SqliteCache {
            conn,
            ttl: TimeDelta::hours(DEFAULT_TTL_HOURS),
        })
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    fn remove(&self, product_name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM price_analyses WHERE product_name = ?1", [product_name])?;
        Ok(())
    }

    pub fn clear_expired(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = timestamp(now - self.ttl);
        let removed = self
            .conn
            .execute("DELETE FROM price_analyses WHERE analyzed_at < ?1", [cutoff])?;
        if removed > 0 {
            info!(removed, "cleared expired analyses");
        }
        Ok(removed)
    }

    pub fn product_names(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT product_name FROM price_analyses ORDER BY product_name")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

impl AnalysisCache for SqliteCache {
    fn get(&mut self, product_name: &str, now: DateTime<Utc>) -> Result<Option<PriceAnalysis>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM price_analyses WHERE product_name = ?1",
                [product_name],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let analysis: PriceAnalysis = match serde_json::from_str(&payload) {
            Ok(a) => a,
            Err(e) => {
                warn!(product = product_name, error = %e, "discarding unreadable cache entry");
                self.remove(product_name)?;
                return Ok(None);
            }
        };

        if is_expired(&analysis, now, self.ttl) {
            debug!(product = product_name, "cache entry expired");
            self.remove(product_name)?;
            return Ok(None);
        }

        Ok(Some(analysis))
    }

    fn put(&mut self, product_name: &str, analysis: &PriceAnalysis) -> Result<()> {
        let payload = serde_json::to_string(analysis)?;
        self.conn.execute(
            "INSERT INTO price_analyses (product_name, analyzed_at, payload)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(product_name) DO UPDATE
             SET analyzed_at = excluded.analyzed_at, payload = excluded.payload",
            params![product_name, timestamp(analysis.analyzed_at), payload],
        )?;
        Ok(())
    }
}

// Used when the database can't be opened, and in tests
pub struct MemoryCache {
    entries: HashMap<String, PriceAnalysis>,
    ttl: TimeDelta,
}

impl MemoryCache {
    pub fn new(ttl: TimeDelta) -> Self {
        MemoryCache {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        MemoryCache::new(TimeDelta::hours(DEFAULT_TTL_HOURS))
    }
}

impl AnalysisCache for MemoryCache {
    fn get(&mut self, product_name: &str, now: DateTime<Utc>) -> Result<Option<PriceAnalysis>> {
        match self.entries.get(product_name) {
            Some(a) if is_expired(a, now, self.ttl) => {
                self.entries.remove(product_name);
                Ok(None)
            }
            Some(a) => Ok(Some(a.clone())),
            None => Ok(None),
        }
    }

    fn put(&mut self, product_name: &str, analysis: &PriceAnalysis) -> Result<()> {
        self.entries.insert(product_name.to_string(), analysis.clone());
        Ok(())
    }
}

pub struct CachedAnalysis {
    pub key: String,
    pub listings: usize,
    pub analysis: PriceAnalysis,
    pub from_cache: bool,
}

// Results without any usable price are returned but never stored, so the
// next run retries them
fn store<C: AnalysisCache + ?Sized>(cache: &mut C, key: &str, analysis: &PriceAnalysis) -> Result<()> {
    if analysis.has_data() {
        cache.put(key, analysis)?;
    }
    Ok(())
}

pub fn analyze_cached<C, F>(
    cache: &mut C,
    product_name: &str,
    now: DateTime<Utc>,
    fetch: F,
) -> Result<PriceAnalysis>
where
    C: AnalysisCache + ?Sized,
    F: FnOnce() -> Result<Vec<ListingRecord>>,
{
    if let Some(hit) = cache.get(product_name, now)? {
        debug!(product = product_name, "using cached analysis");
        return Ok(hit);
    }

    let records = fetch()?;
    let analysis = analyze_at(&records, now);
    store(cache, product_name, &analysis)?;
    Ok(analysis)
}

// Hits come straight from the cache, misses are analysed together in parallel.
// Output is sorted by key.
pub fn analyze_cached_batch<C: AnalysisCache + ?Sized>(
    cache: &mut C,
    groups: Vec<(String, Vec<ListingRecord>)>,
    now: DateTime<Utc>,
) -> Result<Vec<CachedAnalysis>> {
    let mut results = Vec::with_capacity(groups.len());
    let mut misses = Vec::new();
    let mut listings = HashMap::new();

    for (key, records) in groups {
        match cache.get(&key, now)? {
            Some(analysis) => results.push(CachedAnalysis {
                listings: records.len(),
                key,
                analysis,
                from_cache: true,
            }),
            None => {
                listings.insert(key.clone(), records.len());
                misses.push((key, records));
            }
        }
    }

    let hits = results.len();
    for (key, analysis) in analyze_batch_at(&misses, now) {
        store(cache, &key, &analysis)?;
        results.push(CachedAnalysis {
            listings: listings.get(&key).copied().unwrap_or_default(),
            key,
            analysis,
            from_cache: false,
        });
    }

    results.sort_by(|a, b| a.key.cmp(&b.key));
    debug!(hits, misses = misses.len(), "batch analysis done");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> PriceAnalysis {
        let records = vec![
            ListingRecord::sold("m1", "Lens", 12_000.0),
            ListingRecord::sold("m2", "Lens", 14_000.0),
        ];
        analyze_at(&records, now)
    }

    #[test]
    fn sqlite_round_trip() {
        let now = Utc::now();
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let analysis = sample(now);

        cache.put("Lens", &analysis).unwrap();
        let hit = cache.get("Lens", now).unwrap().unwrap();
        assert_eq!(hit.statistics, analysis.statistics);
        assert_eq!(hit.price_distribution, analysis.price_distribution);
        assert_eq!(cache.product_names().unwrap(), vec!["Lens".to_string()]);
    }

    #[test]
    fn sqlite_evicts_on_read() {
        let then = Utc::now() - TimeDelta::hours(25);
        let mut cache = SqliteCache::open_in_memory().unwrap();
        cache.put("Lens", &sample(then)).unwrap();

        assert!(cache.get("Lens", Utc::now()).unwrap().is_none());
        assert!(cache.product_names().unwrap().is_empty());
    }

    #[test]
    fn sqlite_put_overwrites() {
        let now = Utc::now();
        let mut cache = SqliteCache::open_in_memory().unwrap();
        cache.put("Lens", &PriceAnalysis::empty("Lens", now)).unwrap();
        cache.put("Lens", &sample(now)).unwrap();
        assert!(cache.get("Lens", now).unwrap().unwrap().has_data());
    }

    #[test]
    fn clear_expired_sweeps_only_stale_rows() {
        let now = Utc::now();
        let mut cache = SqliteCache::open_in_memory().unwrap();
        cache.put("old", &sample(now - TimeDelta::hours(30))).unwrap();
        cache.put("new", &sample(now - TimeDelta::hours(1))).unwrap();

        assert_eq!(cache.clear_expired(now).unwrap(), 1);
        assert_eq!(cache.product_names().unwrap(), vec!["new".to_string()]);
    }

    #[test]
    fn memory_cache_honours_ttl() {
        let now = Utc::now();
        let mut cache = MemoryCache::new(TimeDelta::hours(1));
        cache.put("Lens", &sample(now - TimeDelta::minutes(90))).unwrap();
        assert!(cache.get("Lens", now).unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn analyze_cached_skips_fetch_on_hit() {
        let now = Utc::now();
        let mut cache = MemoryCache::default();
        cache.put("Lens", &sample(now)).unwrap();

        let a = analyze_cached(&mut cache, "Lens", now, || panic!("should not fetch")).unwrap();
        assert_eq!(a.product_name, "Lens");
    }

    #[test]
    fn analyze_cached_stores_only_real_results() {
        let now = Utc::now();
        let mut cache = MemoryCache::default();

        let empty = analyze_cached(&mut cache, "Nothing", now, || Ok(Vec::new())).unwrap();
        assert!(!empty.has_data());
        assert!(cache.is_empty());

        let fresh = analyze_cached(&mut cache, "Lens", now, || {
            Ok(vec![ListingRecord::new("m1", "Lens", 8_000.0)])
        })
        .unwrap();
        assert_eq!(fresh.statistics.median, 8_000);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn batch_splits_hits_from_misses() {
        let now = Utc::now();
        let mut cache = MemoryCache::default();
        cache.put("Lens", &sample(now)).unwrap();

        let groups = vec![
            ("Tripod".to_string(), vec![
                ListingRecord::new("t1", "Tripod", 4_000.0),
                ListingRecord::new("t2", "Tripod", 6_000.0),
                ListingRecord::new("t3", "Tripod", 5_000.0),
            ]),
            ("Lens".to_string(), vec![ListingRecord::new("x", "Lens", 99_000.0)]),
            ("Nothing".to_string(), Vec::new()),
        ];

        let results = analyze_cached_batch(&mut cache, groups, now).unwrap();
        let keys: Vec<_> = results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["Lens", "Nothing", "Tripod"]);

        // the hit ignores the new listings but still reports their count
        assert!(results[0].from_cache);
        assert_eq!(results[0].listings, 1);
        assert_eq!(results[0].analysis.statistics.median, 13_000);

        assert!(!results[1].from_cache);
        assert_eq!(results[1].listings, 0);
        assert!(!results[1].analysis.has_data());

        assert!(!results[2].from_cache);
        assert_eq!(results[2].listings, 3);
        assert_eq!(results[2].analysis.statistics.median, 5_000);

        // only the new analysis with data was written back
        assert_eq!(cache.len(), 2);
        assert!(cache.get("Tripod", now).unwrap().is_some());
        assert!(cache.get("Nothing", now).unwrap().is_none());
    }

    #[test]
    fn second_batch_is_served_from_cache() {
        let now = Utc::now();
        let mut cache = SqliteCache::open_in_memory().unwrap();
        let groups = vec![("Lens".to_string(), vec![ListingRecord::sold("m1", "Lens", 12_000.0)])];

        let first = analyze_cached_batch(&mut cache, groups.clone(), now).unwrap();
        let second = analyze_cached_batch(&mut cache, groups, now).unwrap();
        assert!(!first[0].from_cache);
        assert!(second[0].from_cache);
        assert_eq!(first[0].analysis.statistics, second[0].analysis.statistics);
    }

    #[test]
    fn reopened_cache_sweeps_stale_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("cache.db");
        let now = Utc::now();
        {
            let mut cache = SqliteCache::open(&db).unwrap();
            cache.put("old", &sample(now - TimeDelta::hours(3))).unwrap();
            cache.put("new", &sample(now)).unwrap();
        }

        let mut cache = SqliteCache::open(&db).unwrap().with_ttl(TimeDelta::hours(2));
        assert_eq!(cache.clear_expired(now).unwrap(), 1);
        assert_eq!(cache.product_names().unwrap(), vec!["new".to_string()]);
    }
}
