//! The `enum` keyword.

use serde_json::{Map, Value};

use crate::context::ValidationContext;
use crate::instance::Instance;

#[derive(Debug)]
pub(crate) struct EnumRule {
    members: Vec<Value>,
    /// Compact rendering of the keyword value, for the message.
    rendered: String,
    /// Absent values are only checked when the property is required.
    check_absent: bool,
}

impl EnumRule {
    pub fn parse(schema: &Map<String, Value>, required: bool) -> Option<Self> {
        let value = schema.get("enum").filter(|v| !v.is_null())?;
        let members = match value {
            Value::Array(members) => members.clone(),
            single => vec![single.clone()],
        };
        Some(Self {
            members,
            rendered: value.to_string(),
            check_absent: required,
        })
    }

    pub fn evaluate(&self, ctx: &mut ValidationContext<'_>, instance: Instance<'_>, path: &str) {
        if instance.is_undefined() && !self.check_absent {
            return;
        }
        if self.members.iter().any(|member| instance.same_as(member)) {
            return;
        }
        ctx.add_error(
            path,
            format!("does not have a value in the enumeration {}", self.rendered),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CheckOptions;
    use serde_json::json;

    fn run(schema: Value, required: bool, instance: Instance<'_>) -> Vec<String> {
        let options = CheckOptions::new();
        let mut ctx = ValidationContext::new(&options);
        let rule = EnumRule::parse(schema.as_object().unwrap(), required).unwrap();
        rule.evaluate(&mut ctx, instance, "color");
        ctx.errors.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn member_must_match_kind_and_value() {
        let schema = json!({"enum": [1, "red", {"a": [true]}]});
        assert!(run(schema.clone(), false, Instance::from(&json!("red"))).is_empty());
        assert!(run(schema.clone(), false, Instance::from(&json!({"a": [true]}))).is_empty());
        assert_eq!(
            run(schema, false, Instance::from(&json!(1.0))),
            [r#"does not have a value in the enumeration [1,"red",{"a":[true]}]"#]
        );
    }

    #[test]
    fn absent_values_skip_unless_required() {
        let schema = json!({"enum": ["a"]});
        assert!(run(schema.clone(), false, Instance::Undefined).is_empty());
        assert_eq!(run(schema, true, Instance::Undefined).len(), 1);
    }
}
