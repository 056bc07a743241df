//! Numeric evaluation: bounds with exclusive flags and divisibility.

use serde_json::{Map, Value};

use super::Limit;
use crate::context::ValidationContext;

const TOLERANCE: f64 = 1e-10;

#[derive(Debug, Default)]
pub(crate) struct NumberRules {
    minimum: Option<Limit>,
    exclusive_minimum: Option<bool>,
    maximum: Option<Limit>,
    exclusive_maximum: Option<bool>,
    divisible_by: Option<Limit>,
    multiple_of: Option<Limit>,
}

fn flag(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Null => None,
        Value::Bool(b) => Some(*b),
        _ => Some(true),
    }
}

impl NumberRules {
    pub fn parse(schema: &Map<String, Value>) -> Self {
        Self {
            minimum: Limit::parse(schema.get("minimum")),
            exclusive_minimum: flag(schema.get("exclusiveMinimum")),
            maximum: Limit::parse(schema.get("maximum")),
            exclusive_maximum: flag(schema.get("exclusiveMaximum")),
            divisible_by: Limit::parse(schema.get("divisibleBy")),
            multiple_of: Limit::parse(schema.get("multipleOf")),
        }
    }

    /// `text` is the number as written, used to find its decimal precision.
    pub fn evaluate(&self, ctx: &mut ValidationContext<'_>, number: f64, text: &str, path: &str) {
        match (self.exclusive_minimum, &self.minimum) {
            (Some(_), None) => {
                ctx.add_error(path, "use of exclusiveMinimum requires presence of minimum")
            }
            (Some(true), Some(min)) if number == min.value => ctx.add_error(
                path,
                format!("must have a minimum value greater than boundary value of {}", min),
            ),
            (_, Some(min)) if number < min.value => {
                ctx.add_error(path, format!("must have a minimum value of {}", min))
            }
            _ => {}
        }

        match (self.exclusive_maximum, &self.maximum) {
            (Some(_), None) => {
                ctx.add_error(path, "use of exclusiveMaximum requires presence of maximum")
            }
            (Some(true), Some(max)) if number == max.value => ctx.add_error(
                path,
                format!("must have a maximum value less than boundary value of {}", max),
            ),
            (_, Some(max)) if number > max.value => {
                ctx.add_error(path, format!("must have a maximum value of {}", max))
            }
            _ => {}
        }

        if let Some(divisor) = &self.divisible_by {
            if tolerant_fmod(number, text, divisor.value, &divisor.text) != 0.0 {
                ctx.add_error(path, format!("is not divisible by {}", divisor));
            }
        }
        if let Some(divisor) = &self.multiple_of {
            if tolerant_fmod(number, text, divisor.value, &divisor.text) != 0.0 {
                ctx.add_error(path, format!("must be a multiple of {}", divisor));
            }
        }
    }
}

/// Floating remainder that absorbs binary representation error.
///
/// A remainder within 1e-10 of zero or of the divisor counts as zero;
/// otherwise it is rounded to the larger decimal precision of the two
/// operands as written.
pub(crate) fn tolerant_fmod(number: f64, number_text: &str, divisor: f64, divisor_text: &str) -> f64 {
    let modulus = number % divisor;
    if modulus.abs() < TOLERANCE || (modulus.abs() - divisor.abs()).abs() < TOLERANCE {
        return 0.0;
    }
    let precision = decimal_places(number_text).max(decimal_places(divisor_text));
    let scale = 10f64.powi(precision as i32);
    (modulus * scale).round() / scale
}

/// Digits after the decimal point, accounting for an exponent
/// (`1.25e-3` has five).
fn decimal_places(text: &str) -> u32 {
    let lower = text.trim().to_ascii_lowercase();
    let (mantissa, exponent) = match lower.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().unwrap_or(0)),
        None => (lower.as_str(), 0),
    };
    let fraction = mantissa
        .split_once('.')
        .map(|(_, fraction)| fraction.len() as i64)
        .unwrap_or(0);
    (fraction - exponent).clamp(0, 15) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckOptions;
    use serde_json::json;

    fn run(schema: Value, number: Value) -> Vec<String> {
        let options = CheckOptions::new();
        let mut ctx = ValidationContext::new(&options);
        let rules = NumberRules::parse(schema.as_object().unwrap());
        let text = number.to_string();
        rules.evaluate(&mut ctx, number.as_f64().unwrap(), &text, "");
        ctx.errors.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn decimal_places_from_text() {
        assert_eq!(decimal_places("10"), 0);
        assert_eq!(decimal_places("0.1"), 1);
        assert_eq!(decimal_places("1.25e-3"), 5);
        assert_eq!(decimal_places("1.5E2"), 0);
        assert_eq!(decimal_places("-3.125"), 3);
    }

    #[test]
    fn fmod_tolerates_representation_error() {
        assert_eq!(tolerant_fmod(10.0, "10", 0.1, "0.1"), 0.0);
        assert_eq!(tolerant_fmod(0.3, "0.3", 0.1, "0.1"), 0.0);
        assert_eq!(tolerant_fmod(-10.0, "-10", 0.1, "0.1"), 0.0);
        assert_ne!(tolerant_fmod(10.0, "10", 3.0, "3"), 0.0);
        assert_ne!(tolerant_fmod(0.35, "0.35", 0.1, "0.1"), 0.0);
    }

    #[test]
    fn multiple_of_and_divisible_by() {
        assert!(run(json!({"multipleOf": 0.1}), json!(10)).is_empty());
        assert_eq!(run(json!({"multipleOf": 3}), json!(10)), ["must be a multiple of 3"]);
        assert_eq!(run(json!({"divisibleBy": 4}), json!(6)), ["is not divisible by 4"]);
    }

    #[test]
    fn inclusive_and_exclusive_bounds() {
        assert!(run(json!({"minimum": 2}), json!(2)).is_empty());
        assert_eq!(
            run(json!({"minimum": 2, "exclusiveMinimum": true}), json!(2)),
            ["must have a minimum value greater than boundary value of 2"]
        );
        assert_eq!(
            run(json!({"maximum": 1.5}), json!(2)),
            ["must have a maximum value of 1.5"]
        );
        assert_eq!(
            run(json!({"maximum": 2, "exclusiveMaximum": true}), json!(2)),
            ["must have a maximum value less than boundary value of 2"]
        );
        assert!(run(json!({"maximum": 2, "exclusiveMaximum": false}), json!(2)).is_empty());
    }

    #[test]
    fn exclusive_flag_without_bound_is_reported() {
        assert_eq!(
            run(json!({"exclusiveMinimum": true}), json!(0)),
            ["use of exclusiveMinimum requires presence of minimum"]
        );
        assert_eq!(
            run(json!({"exclusiveMaximum": false}), json!(0)),
            ["use of exclusiveMaximum requires presence of maximum"]
        );
    }
}
