//! Declarative field validation
//!
//! Each entity describes its fields as a list of [`FieldCheck`]s and a single
//! [`validate`] walks them. Rules never look outside the field they are
//! attached to; cross-entity constraints (such as label uniqueness) live with
//! the entity's persistence hook.

use regex::Regex;

/// A constraint on one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// The field may not be empty
    Required,
    /// No leading or trailing whitespace
    NoSurroundingSpace,
    /// Numeric value within `min..=max`
    Range {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// The text must match a regular expression
    Pattern {
        /// Regular expression source
        regex: &'static str,
        /// Human-readable form of the constraint
        description: &'static str,
    },
}

/// Value of a field under check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Free text
    Text(&'a str),
    /// Integral value
    Number(i64),
}

/// A field, its current value and the rules it must satisfy
#[derive(Debug, Clone, Copy)]
pub struct FieldCheck<'a> {
    /// Field name used in messages
    pub name: &'static str,
    /// Current value
    pub value: FieldValue<'a>,
    /// Rules applied in order
    pub rules: &'static [Rule],
}

impl<'a> FieldCheck<'a> {
    /// Check a text field
    pub fn text(name: &'static str, value: &'a str, rules: &'static [Rule]) -> Self {
        Self {
            name,
            value: FieldValue::Text(value),
            rules,
        }
    }

    /// Check a numeric field
    pub fn number(name: &'static str, value: i64, rules: &'static [Rule]) -> Self {
        Self {
            name,
            value: FieldValue::Number(value),
            rules,
        }
    }
}

/// Validate `fields` of an entity named `entity`
///
/// Returns the first violation as a message, or `None` when every rule holds.
pub fn validate(entity: &str, fields: &[FieldCheck<'_>]) -> Option<String> {
    fields.iter().find_map(|field| {
        field
            .rules
            .iter()
            .find_map(|rule| check_rule(field.value, rule))
            .map(|problem| format!("{entity}.{}: {problem}", field.name))
    })
}

fn check_rule(value: FieldValue<'_>, rule: &Rule) -> Option<String> {
    match (rule, value) {
        (Rule::Required, FieldValue::Text(text)) if text.is_empty() => {
            Some("is required".to_string())
        }
        (Rule::NoSurroundingSpace, FieldValue::Text(text)) if text.trim() != text => {
            Some("has leading or trailing whitespace".to_string())
        }
        (Rule::Range { min, max }, FieldValue::Number(n)) if n < *min || n > *max => {
            Some(format!("{n} is outside {min}..={max}"))
        }
        (Rule::Pattern { regex, description }, FieldValue::Text(text)) => {
            match Regex::new(regex) {
                Ok(re) if re.is_match(text) => None,
                Ok(_) => Some(format!("{text:?} {description}")),
                Err(e) => Some(format!("rule {regex:?} does not compile: {e}")),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &[Rule] = &[Rule::Required, Rule::NoSurroundingSpace];
    const ORDER: &[Rule] = &[Rule::Range { min: 1, max: 10 }];
    const ENV: &[Rule] = &[Rule::Pattern {
        regex: r"^[^_]*_[^_]*$",
        description: "must mark the segment with one '_'",
    }];

    #[test]
    fn test_valid_fields_pass() {
        let fields = [
            FieldCheck::text("label", "*p", NAME),
            FieldCheck::number("order", 3, ORDER),
            FieldCheck::text("environment", "#_", ENV),
        ];
        assert_eq!(validate("cluster", &fields), None);
    }

    #[test]
    fn test_required() {
        let fields = [FieldCheck::text("label", "", NAME)];
        assert_eq!(
            validate("protosegment", &fields).as_deref(),
            Some("protosegment.label: is required")
        );
    }

    #[test]
    fn test_surrounding_space() {
        let fields = [FieldCheck::text("label", " *p", NAME)];
        assert!(validate("protosegment", &fields)
            .unwrap()
            .contains("whitespace"));
    }

    #[test]
    fn test_range() {
        let fields = [FieldCheck::number("order", 0, ORDER)];
        assert!(validate("cluster", &fields).unwrap().contains("outside 1..=10"));
    }

    #[test]
    fn test_pattern() {
        let fields = [FieldCheck::text("environment", "V_V_", ENV)];
        assert!(validate("cluster", &fields).unwrap().contains("one '_'"));
    }

    #[test]
    fn test_rules_ignore_mismatched_kinds() {
        let fields = [FieldCheck::number("label", 0, NAME)];
        assert_eq!(validate("zone", &fields), None);
    }
}
