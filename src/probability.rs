//! Pure numeric normalization for binary market probabilities.
//!
//! Everything in this module is side-effect free: raw JSON values go in,
//! `Decimal` probabilities come out. Malformed input degrades to `None` or
//! an empty list, never to an error.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

/// Best-effort coercion of a JSON value into a `Decimal`.
///
/// Accepts numbers and numeric strings; anything else is `None`.
pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(raw) => parse_decimal(raw),
        Value::Number(num) => parse_decimal(&num.to_string()),
        _ => None,
    }
}

/// Large floats render in scientific notation, which plain `parse` rejects.
fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    raw.parse()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// Parse a field that is either a JSON array or a string containing an
/// encoded JSON array.
///
/// The Gamma API serializes `clobTokenIds` and `outcomes` both ways
/// depending on the endpoint. Anything else yields an empty list.
pub fn parse_json_array(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Extract the coercible `price` fields from an ordered list of book levels.
///
/// Order is preserved; unparseable entries are dropped silently.
pub fn extract_prices(levels: Option<&Value>) -> Vec<Decimal> {
    let Some(Value::Array(levels)) = levels else {
        return Vec::new();
    };
    levels
        .iter()
        .filter_map(|level| level.get("price").and_then(to_decimal))
        .collect()
}

/// Normalize two complementary outcome prices into probabilities.
///
/// - both absent: both stay absent
/// - one absent: the present side is forced to 1.0
/// - both present: divided by their sum, with a (0.5, 0.5) tie-break when
///   the sum is not positive
pub fn normalize_binary_probabilities(
    prob_a: Option<Decimal>,
    prob_b: Option<Decimal>,
) -> (Option<Decimal>, Option<Decimal>) {
    match (prob_a, prob_b) {
        (None, None) => (None, None),
        (None, Some(_)) => (None, Some(Decimal::ONE)),
        (Some(_), None) => (Some(Decimal::ONE), None),
        (Some(a), Some(b)) => {
            let total = a + b;
            if total <= Decimal::ZERO {
                let half = Decimal::new(5, 1);
                (Some(half), Some(half))
            } else {
                (Some(a / total), Some(b / total))
            }
        }
    }
}

/// Two complementary outcome probabilities, in token order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbabilityPair {
    /// Probability of the first outcome.
    pub first: Option<Decimal>,
    /// Probability of the second outcome.
    pub second: Option<Decimal>,
}

impl ProbabilityPair {
    /// Build a pair by normalizing two raw prices.
    pub fn normalized(prob_a: Option<Decimal>, prob_b: Option<Decimal>) -> Self {
        let (first, second) = normalize_binary_probabilities(prob_a, prob_b);
        Self { first, second }
    }
}
