use crate::model::Carrier::{self, Post, Rakuraku, Yuuyuu};
use crate::model::SizeClass::{self, ExtraLarge, Large, Medium, Small};
use crate::model::{ShippingCalculation, ShippingMethod, ShippingOption};

const fn method(
    name: &'static str,
    cost: u32,
    description: &'static str,
    size: SizeClass,
    max_weight: Option<f64>,
    carrier: Carrier,
) -> ShippingMethod {
    ShippingMethod { name, cost, description, size, max_weight, carrier }
}

// 2024 rates, results are reported in this order
pub const SHIPPING_METHODS: [ShippingMethod; 17] = [
    method("らくらくメルカリ便 ネコポス", 210, "追跡あり・匿名配送・A4サイズ・厚さ3cm以内・1kg以内", Small, Some(1.0), Rakuraku),
    method("らくらくメルカリ便 宅急便コンパクト", 450, "追跡あり・匿名配送・専用BOX", Small, None, Rakuraku),
    method("らくらくメルカリ便 60サイズ", 750, "追跡あり・匿名配送・60サイズ", Medium, None, Rakuraku),
    method("らくらくメルカリ便 80サイズ", 850, "追跡あり・匿名配送・80サイズ", Medium, None, Rakuraku),
    method("らくらくメルカリ便 100サイズ", 1050, "追跡あり・匿名配送・100サイズ", Large, None, Rakuraku),
    method("らくらくメルカリ便 120サイズ", 1200, "追跡あり・匿名配送・120サイズ", Large, None, Rakuraku),
    method("らくらくメルカリ便 140サイズ", 1450, "追跡あり・匿名配送・140サイズ", ExtraLarge, None, Rakuraku),
    method("らくらくメルカリ便 160サイズ", 1700, "追跡あり・匿名配送・160サイズ", ExtraLarge, None, Rakuraku),
    method("ゆうゆうメルカリ便 ゆうパケット", 230, "追跡あり・匿名配送・A4サイズ・厚さ3cm以内・1kg以内", Small, Some(1.0), Yuuyuu),
    method("ゆうゆうメルカリ便 ゆうパケットポスト", 215, "追跡あり・匿名配送・ポスト投函", Small, Some(1.0), Yuuyuu),
    method("ゆうゆうメルカリ便 ゆうパック60サイズ", 770, "追跡あり・匿名配送・60サイズ", Medium, None, Yuuyuu),
    method("ゆうゆうメルカリ便 ゆうパック80サイズ", 870, "追跡あり・匿名配送・80サイズ", Medium, None, Yuuyuu),
    method("ゆうゆうメルカリ便 ゆうパック100サイズ", 1070, "追跡あり・匿名配送・100サイズ", Large, None, Yuuyuu),
    method("定形郵便 25g以内", 84, "追跡なし・25g以内", Small, Some(0.025), Post),
    method("定形郵便 50g以内", 94, "追跡なし・50g以内", Small, Some(0.05), Post),
    method("定形外郵便 規格内 50g以内", 120, "追跡なし・規格内・50g以内", Small, Some(0.05), Post),
    method("定形外郵便 規格内 100g以内", 140, "追跡なし・規格内・100g以内", Small, Some(0.1), Post),
];

// A service fits a package when its tier is the same or larger.
pub fn is_size_available(method_size: SizeClass, package_size: SizeClass) -> bool {
    method_size >= package_size
}

// Unknown weight never rules a service out.
pub fn is_weight_available(max_weight: Option<f64>, weight: Option<f64>) -> bool {
    match (max_weight, weight) {
        (Some(limit), Some(w)) => w <= limit,
        _ => true,
    }
}

pub fn calculate_shipping(size: SizeClass, weight: Option<f64>) -> ShippingCalculation {
    calculate_shipping_with(&SHIPPING_METHODS, size, weight)
}

pub fn calculate_shipping_with(
    table: &[ShippingMethod],
    size: SizeClass,
    weight: Option<f64>,
) -> ShippingCalculation {
    let eligible: Vec<&ShippingMethod> = table
        .iter()
        .filter(|m| is_size_available(m.size, size) && is_weight_available(m.max_weight, weight))
        .collect();

    // first of the cheapest wins
    let recommended = eligible
        .iter()
        .copied()
        .fold(None::<&ShippingMethod>, |best, m| match best {
            Some(b) if b.cost <= m.cost => Some(b),
            _ => Some(m),
        })
        .map(|m| m.name.to_string())
        .unwrap_or_default();

    ShippingCalculation {
        size,
        weight,
        methods: eligible
            .iter()
            .map(|m| ShippingOption {
                name: m.name.to_string(),
                cost: m.cost,
                description: m.description.to_string(),
            })
            .collect(),
        recommended,
    }
}
