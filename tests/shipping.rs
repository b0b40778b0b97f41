// tests/shipping.rs
//
// Eligibility and recommendation over the real shipping table.
//
use mercari_analyzer::model::SizeClass::{self, ExtraLarge, Large, Medium, Small};
use mercari_analyzer::shipping::{calculate_shipping, SHIPPING_METHODS};

fn names(size: SizeClass, weight: Option<f64>) -> Vec<String> {
    calculate_shipping(size, weight)
        .methods
        .into_iter()
        .map(|m| m.name)
        .collect()
}

#[test]
fn small_half_kilo_drops_letter_post() {
    let calc = calculate_shipping(Small, Some(0.5));

    assert_eq!(calc.size, Small);
    assert_eq!(calc.weight, Some(0.5));
    assert_eq!(calc.methods.len(), 13);
    assert!(calc.methods.iter().all(|m| !m.name.starts_with("定形")));
    assert_eq!(calc.recommended, "らくらくメルカリ便 ネコポス");

    let cheapest = calc.methods.iter().map(|m| m.cost).min().unwrap();
    let rec = calc.methods.iter().find(|m| m.name == calc.recommended).unwrap();
    assert_eq!(rec.cost, cheapest);
}

#[test]
fn unknown_weight_keeps_everything_that_fits() {
    let calc = calculate_shipping(Small, None);
    assert_eq!(calc.methods.len(), SHIPPING_METHODS.len());
    assert_eq!(calc.recommended, "定形郵便 25g以内");
}

#[test]
fn results_follow_table_order() {
    let expected: Vec<String> = SHIPPING_METHODS
        .iter()
        .filter(|m| m.size >= Medium)
        .map(|m| m.name.to_string())
        .collect();
    assert_eq!(names(Medium, None), expected);
    assert_eq!(expected.len(), 9);
    assert_eq!(calculate_shipping(Medium, None).recommended, "らくらくメルカリ便 60サイズ");
}

#[test]
fn weight_just_over_a_ceiling() {
    let calc = calculate_shipping(Small, Some(0.03));
    assert!(!calc.methods.iter().any(|m| m.name == "定形郵便 25g以内"));
    assert_eq!(calc.recommended, "定形郵便 50g以内");

    let heavy = calculate_shipping(Small, Some(1.5));
    assert_eq!(heavy.methods.len(), 10);
    assert_eq!(heavy.recommended, "らくらくメルカリ便 宅急便コンパクト");
}

#[test]
fn large_packages() {
    let calc = calculate_shipping(Large, Some(8.0));
    assert_eq!(calc.methods.len(), 5);
    assert_eq!(calc.recommended, "らくらくメルカリ便 100サイズ");
}

#[test]
fn extra_large_excludes_smaller_tiers() {
    let calc = calculate_shipping(ExtraLarge, None);
    assert_eq!(
        names(ExtraLarge, None),
        ["らくらくメルカリ便 140サイズ", "らくらくメルカリ便 160サイズ"]
    );
    assert_eq!(calc.recommended, "らくらくメルカリ便 140サイズ");
}

#[test]
fn calculation_serializes_size_as_kebab_case() {
    let json = serde_json::to_value(calculate_shipping(ExtraLarge, None)).unwrap();
    assert_eq!(json["size"], "extra-large");
    assert!(json.get("weight").is_none());
}
