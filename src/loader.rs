use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::ListingRecord;
use crate::stats::sanitize_price;

pub const DEFAULT_LISTING_LIMIT: usize = 20;

const SOLD_STATUSES: [&str; 2] = ["STATUS_SOLD_OUT", "ITEM_STATUS_SOLD_OUT"];
pub const UNKNOWN_CONDITION: &str = "不明";

// Either a JSON number or a plain numeric string, "9,800" is dropped
fn price_of(item: &Value) -> Option<f64> {
    match item.get("price")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn parse_item(item: &Value, fallback_name: &str) -> Option<ListingRecord> {
    let id = match item.get("id")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let price = sanitize_price(price_of(item)?)?;

    let sold = item
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|s| SOLD_STATUSES.contains(&s));

    let image_url = item
        .get("thumbnails")
        .and_then(Value::as_array)
        .and_then(|t| t.first())
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(ListingRecord {
        name: text_of(item, "name").unwrap_or_else(|| fallback_name.to_string()),
        price,
        sold_price: sold.then_some(price),
        condition: Some(text_of(item, "itemCondition").unwrap_or_else(|| UNKNOWN_CONDITION.to_string())),
        shipping_method: text_of(item, "shippingMethodId"),
        image_url,
        url: Some(format!("https://jp.mercari.com/item/{id}")),
        id,
    })
}

pub fn parse_search_response(response: &Value, fallback_name: &str, limit: usize) -> Result<Vec<ListingRecord>> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .ok_or(Error::MissingItems)?;

    let records: Vec<ListingRecord> = items
        .iter()
        .take(limit)
        .filter_map(|item| parse_item(item, fallback_name))
        .collect();

    let dropped = items.len().min(limit) - records.len();
    if dropped > 0 {
        debug!(product = fallback_name, dropped, "dropped malformed search items");
    }

    Ok(records)
}

// Dump file: { product name: search response, ... }
pub fn load_search_dump(path: impl AsRef<Path>, limit: usize) -> Result<Vec<(String, Vec<ListingRecord>)>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let dump: serde_json::Map<String, Value> = serde_json::from_str(&text)?;

    let mut groups = Vec::with_capacity(dump.len());
    for (product, response) in &dump {
        match parse_search_response(response, product, limit) {
            Ok(records) => groups.push((product.clone(), records)),
            Err(e) => warn!(product = %product, error = %e, "skipping product"),
        }
    }

    info!(path = %path.display(), products = groups.len(), "loaded search dump");
    Ok(groups)
}

pub fn load_listings(path: impl AsRef<Path>) -> Result<Vec<ListingRecord>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
