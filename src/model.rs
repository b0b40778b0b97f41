use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// Name used when there are no records at all
pub const PLACEHOLDER_NAME: &str = "商品";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: String,
    pub name: String,
    pub price: f64,
    // only set when sold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ListingRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        ListingRecord {
            id: id.into(),
            name: name.into(),
            price,
            sold_price: None,
            condition: None,
            shipping_method: None,
            image_url: None,
            url: None,
        }
    }

    pub fn sold(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        ListingRecord {
            sold_price: Some(price),
            ..ListingRecord::new(id, name, price)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub min: i64,
    pub max: i64,
    pub average: i64,
    pub median: i64,
    pub recommended_price: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub price: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Sold,
    Asking,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAnalysis {
    pub product_name: String,
    pub analyzed_at: DateTime<Utc>,
    // Sold prices as observed, before outlier removal.
    pub sold_prices: Vec<f64>,
    pub statistics: Statistics,
    pub price_distribution: Vec<PriceBucket>,
    #[serde(default)]
    pub source: PriceSource,
    #[serde(default)]
    pub outliers_removed: usize,
}

impl PriceAnalysis {
    pub fn empty(product_name: impl Into<String>, analyzed_at: DateTime<Utc>) -> Self {
        PriceAnalysis {
            product_name: product_name.into(),
            analyzed_at,
            sold_prices: Vec::new(),
            statistics: Statistics::default(),
            price_distribution: Vec::new(),
            source: PriceSource::None,
            outliers_removed: 0,
        }
    }

    // False for the zeroed result produced when no usable price was found.
    pub fn has_data(&self) -> bool {
        !(self.statistics.min == 0 && self.statistics.max == 0) && !self.price_distribution.is_empty()
    }

    pub fn into_option(self) -> Option<Self> {
        if self.has_data() { Some(self) } else { None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl SizeClass {
    pub const ALL: [SizeClass; 4] = [
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::ExtraLarge,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::ExtraLarge => "extra-large",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "small" => Ok(SizeClass::Small),
            "medium" => Ok(SizeClass::Medium),
            "large" => Ok(SizeClass::Large),
            "extra-large" => Ok(SizeClass::ExtraLarge),
            other => Err(Error::InvalidSize(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Rakuraku,
    Yuuyuu,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShippingMethod {
    pub name: &'static str,
    pub cost: u32,
    pub description: &'static str,
    pub size: SizeClass,
    // kg
    pub max_weight: Option<f64>,
    pub carrier: Carrier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub name: String,
    pub cost: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCalculation {
    pub size: SizeClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub methods: Vec<ShippingOption>,
    // Name of the cheapest eligible method, empty if none.
    pub recommended: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_parses_and_orders() {
        assert_eq!("extra-large".parse::<SizeClass>().unwrap(), SizeClass::ExtraLarge);
        assert_eq!(" small ".parse::<SizeClass>().unwrap(), SizeClass::Small);
        assert!("huge".parse::<SizeClass>().is_err());
        assert!(SizeClass::Small < SizeClass::Medium);
        assert!(SizeClass::Large < SizeClass::ExtraLarge);
    }

    #[test]
    fn size_class_serializes_kebab_case() {
        let json = serde_json::to_string(&SizeClass::ExtraLarge).unwrap();
        assert_eq!(json, "\"extra-large\"");
    }

    #[test]
    fn empty_analysis_has_no_data() {
        let a = PriceAnalysis::empty(PLACEHOLDER_NAME, Utc::now());
        assert!(!a.has_data());
        assert!(a.into_option().is_none());
    }
}
