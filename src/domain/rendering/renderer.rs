//! `{{variable}}` substitution for message templates.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::warn;

use super::CurrencyFormat;
use crate::domain::conversation::Context;
use crate::domain::flow::FlowSettings;

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*(?:\|\s*([a-z_]+)\s*)?\}\}")
        .expect("template token pattern is valid")
});

/// Substitutes context values into templates.
///
/// Never fails: unknown variables render the placeholder and are logged,
/// unknown filters render the raw value. Output depends only on the
/// template and the context.
#[derive(Debug, Clone, Default)]
pub struct VariableRenderer {
    currency: CurrencyFormat,
    currency_variables: BTreeSet<String>,
    placeholder: String,
}

impl VariableRenderer {
    pub fn new(currency: CurrencyFormat, placeholder: impl Into<String>) -> Self {
        Self {
            currency,
            currency_variables: BTreeSet::new(),
            placeholder: placeholder.into(),
        }
    }

    pub fn from_settings(settings: &FlowSettings) -> Self {
        Self::new(settings.currency.clone(), settings.missing_placeholder.clone())
            .with_currency_variables(settings.currency_variables.iter().cloned())
    }

    /// Marks variables that are always formatted as money.
    pub fn with_currency_variables(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.currency_variables.extend(names);
        self
    }

    pub fn currency(&self) -> &CurrencyFormat {
        &self.currency
    }

    pub fn render(&self, template: &str, context: &Context) -> String {
        TOKEN
            .replace_all(template, |caps: &Captures| {
                let path = &caps[1];
                let filter = caps.get(2).map(|m| m.as_str());
                self.substitute(path, filter, context)
            })
            .into_owned()
    }

    fn substitute(&self, path: &str, filter: Option<&str>, context: &Context) -> String {
        let value = match lookup(context, path) {
            Some(Value::Null) | None => {
                warn!(variable = %path, "Template variable missing from context");
                return self.placeholder.clone();
            }
            Some(value) => value,
        };

        let as_currency = filter == Some("currency") || self.currency_variables.contains(path);
        if as_currency {
            if let Some(amount) = as_number(value) {
                return self.currency.format(amount);
            }
            warn!(variable = %path, "Currency variable is not numeric");
        }

        let text = display(value);
        match filter {
            None | Some("currency") => text,
            Some("upper") => text.to_uppercase(),
            Some("lower") => text.to_lowercase(),
            Some("title") => title_case(&text),
            Some(other) => {
                warn!(variable = %path, filter = %other, "Unknown template filter");
                text
            }
        }
    }
}

/// Resolves `a.b.c` through nested objects.
fn lookup<'a>(context: &'a Context, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
