//! The format collaborator: named predicates consulted for `format`.
//!
//! Unknown format names are always valid. Each built-in validator ignores
//! instance kinds it does not apply to.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use url::Url;

use crate::error::ErrorSet;
use crate::instance::Instance;
use crate::types::coerce_numeric;

/// A named format check. Returns the violation message, if any.
pub trait FormatValidator: Send + Sync {
    fn validate(&self, instance: &Instance<'_>) -> Option<String>;
}

impl<F> FormatValidator for F
where
    F: Fn(&Instance<'_>) -> Option<String> + Send + Sync,
{
    fn validate(&self, instance: &Instance<'_>) -> Option<String> {
        self(instance)
    }
}

/// Registry of format validators keyed by format name.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    validators: HashMap<String, Arc<dyn FormatValidator>>,
}

impl FormatRegistry {
    /// An empty registry: every format is accepted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in draft 3 / draft 4 formats.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("date-time", date_time);
        registry.register("date", date);
        registry.register("time", time);
        registry.register("utc-millisec", utc_millisec);
        registry.register("regex", regex_format);
        registry.register("color", color);
        registry.register("style", style);
        registry.register("phone", phone);
        registry.register("uri", uri);
        registry.register("email", email);
        registry.register("ip-address", ipv4);
        registry.register("ipv4", ipv4);
        registry.register("ipv6", ipv6);
        registry.register("host-name", hostname);
        registry.register("hostname", hostname);
        registry
    }

    /// Add or replace the validator for `name`.
    pub fn register(&mut self, name: impl Into<String>, validator: impl FormatValidator + 'static) {
        self.validators.insert(name.into(), Arc::new(validator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    /// Check `instance` against format `name`, recording any violation at `path`.
    pub fn validate(&self, name: &str, instance: &Instance<'_>, path: &str, errors: &mut ErrorSet) {
        if let Some(validator) = self.validators.get(name) {
            if let Some(message) = validator.validate(instance) {
                errors.add_error(path, message);
            }
        }
    }
}

impl std::fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("FormatRegistry").field("formats", &names).finish()
    }
}

fn string_of<'a>(instance: &Instance<'a>) -> Option<&'a str> {
    match *instance {
        Instance::String(s) => Some(s),
        _ => None,
    }
}

fn date_time(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    DateTime::parse_from_rfc3339(s).err().map(|_| {
        format!(
            "Invalid date-time \"{}\", expected format YYYY-MM-DDThh:mm:ssZ or YYYY-MM-DDThh:mm:ss+hh:mm",
            s
        )
    })
}

fn date(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .err()
        .map(|_| format!("Invalid date \"{}\", expected format YYYY-MM-DD", s))
}

fn time(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .err()
        .map(|_| format!("Invalid time \"{}\", expected format hh:mm:ss", s))
}

fn utc_millisec(instance: &Instance<'_>) -> Option<String> {
    let valid = match *instance {
        Instance::Number(_) => true,
        Instance::String(s) => coerce_numeric(s).is_some(),
        _ => return None,
    };
    (!valid).then(|| "Invalid time, expected integer of milliseconds since Epoch".to_string())
}

fn regex_format(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    Regex::new(s).err().map(|_| format!("Invalid regex format {}", s))
}

const CSS_COLORS: &[&str] = &[
    "maroon", "red", "orange", "yellow", "olive", "green", "purple", "fuchsia", "lime", "teal",
    "aqua", "blue", "navy", "black", "gray", "silver", "white",
];

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").unwrap())
}

fn color(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    let valid = CSS_COLORS.contains(&s.to_ascii_lowercase().as_str()) || hex_color_regex().is_match(s);
    (!valid).then(|| format!("Invalid color \"{}\"", s))
}

fn style_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*-?[_a-zA-Z][_a-zA-Z0-9-]*\s*:\s*[^;]+$").unwrap())
}

fn style(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    let valid = s
        .split(';')
        .filter(|declaration| !declaration.trim().is_empty())
        .all(|declaration| style_regex().is_match(declaration));
    (!valid).then(|| format!("Invalid style \"{}\"", s))
}

fn phone_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?(\(\d{3}\)|\d{3}) \d{3} \d{4}$").unwrap())
}

fn phone(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    (!phone_regex().is_match(s)).then(|| format!("Invalid phone number \"{}\"", s))
}

fn uri(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    Url::parse(s).err().map(|_| format!("Invalid URL format \"{}\"", s))
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$",
        )
        .unwrap()
    })
}

fn email(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    (!email_regex().is_match(s)).then(|| format!("Invalid email \"{}\"", s))
}

fn ipv4(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    s.parse::<Ipv4Addr>()
        .err()
        .map(|_| format!("Invalid IP address \"{}\"", s))
}

fn ipv6(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    s.parse::<Ipv6Addr>()
        .err()
        .map(|_| format!("Invalid IPv6 address \"{}\"", s))
}

fn hostname_label_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").unwrap())
}

fn hostname(instance: &Instance<'_>) -> Option<String> {
    let s = string_of(instance)?;
    let name = s.strip_suffix('.').unwrap_or(s);
    let valid = !name.is_empty()
        && name.len() <= 253
        && name.split('.').all(|label| hostname_label_regex().is_match(label));
    (!valid).then(|| format!("Invalid hostname \"{}\"", s))
}
