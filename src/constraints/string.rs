//! String evaluation: length bounds and `pattern`.

use regex::Regex;
use serde_json::{Map, Value};

use super::{KeywordSource, Limit};
use crate::context::ValidationContext;
use crate::error::ConfigError;

#[derive(Debug)]
struct PatternRule {
    pattern: String,
    regex: Result<Regex, String>,
}

#[derive(Debug, Default)]
pub(crate) struct StringRules {
    max_length: Option<Limit>,
    min_length: Option<Limit>,
    pattern: Option<PatternRule>,
}

impl StringRules {
    pub fn parse<'s, B: KeywordSource<'s>>(schema: &'s Map<String, Value>, source: &mut B) -> Self {
        // Patterns are used as-is: unanchored, and `#` needs no escaping
        // since no delimiter is involved.
        let pattern = schema
            .get("pattern")
            .and_then(Value::as_str)
            .map(|pattern| PatternRule {
                pattern: pattern.to_string(),
                regex: source.regex(pattern),
            });

        Self {
            max_length: Limit::parse(schema.get("maxLength")),
            min_length: Limit::parse(schema.get("minLength")),
            pattern,
        }
    }

    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        text: &str,
        path: &str,
    ) -> Result<(), ConfigError> {
        if self.max_length.is_some() || self.min_length.is_some() {
            let length = text.chars().count() as f64;
            if let Some(max) = &self.max_length {
                if length > max.value {
                    ctx.add_error(path, format!("must be at most {} characters long", max));
                }
            }
            if let Some(min) = &self.min_length {
                if length < min.value {
                    ctx.add_error(path, format!("must be at least {} characters long", min));
                }
            }
        }

        if let Some(rule) = &self.pattern {
            let regex = rule
                .regex
                .as_ref()
                .map_err(|message| ConfigError::InvalidPattern {
                    path: path.to_string(),
                    pattern: rule.pattern.clone(),
                    message: message.clone(),
                })?;
            if !regex.is_match(text) {
                ctx.add_error(
                    path,
                    format!("does not match the regex pattern {}", rule.pattern),
                );
            }
        }
        Ok(())
    }
}
