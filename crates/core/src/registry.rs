//! Named filters callable from the page layer.
//!
//! Every filter is a variant of [`Filter`] with a fixed name and a plain `fn`
//! pointer over JSON values. Callers declare the names they rely on through
//! [`FilterRegistry::require`] when they are constructed, so a misspelt name
//! fails at startup instead of in the middle of a build.

use crate::error::{Error, Result};
use crate::filters;
use crate::tags;
use crate::types::DateValue;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Dynamic filter signature: the piped value followed by call arguments
pub type FilterFn = fn(&Value, &[Value]) -> Result<Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Filter {
    ReadableDate,
    HtmlDateString,
    Head,
    Min,
    FilterDenylist,
}

impl Filter {
    pub const ALL: [Filter; 5] = [
        Filter::ReadableDate,
        Filter::HtmlDateString,
        Filter::Head,
        Filter::Min,
        Filter::FilterDenylist,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Filter::ReadableDate => "readableDate",
            Filter::HtmlDateString => "htmlDateString",
            Filter::Head => "head",
            Filter::Min => "min",
            Filter::FilterDenylist => "filterDenylist",
        }
    }

    pub fn function(self) -> FilterFn {
        match self {
            Filter::ReadableDate => readable_date,
            Filter::HtmlDateString => html_date_string,
            Filter::Head => head,
            Filter::Min => min,
            Filter::FilterDenylist => filter_denylist,
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Filter::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::UnknownFilter(s.to_string()))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub struct FilterRegistry {
    filters: BTreeMap<&'static str, FilterFn>,
}

impl FilterRegistry {
    /// All built-in filters
    pub fn builtin() -> Self {
        Self {
            filters: Filter::ALL
                .into_iter()
                .map(|f| (f.name(), f.function()))
                .collect(),
        }
    }

    /// Build a registry from an explicit set, rejecting duplicates
    pub fn from_filters(filters: impl IntoIterator<Item = Filter>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for filter in filters {
            if map.insert(filter.name(), filter.function()).is_some() {
                return Err(Error::InvalidData(format!(
                    "Filter '{}' registered twice",
                    filter
                )));
            }
        }
        Ok(Self { filters: map })
    }

    /// Fail with `UnknownFilter` on the first name that is not registered
    pub fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            self.get(name)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<FilterFn> {
        self.filters
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownFilter(name.to_string()))
    }

    pub fn apply(&self, name: &str, input: &Value, args: &[Value]) -> Result<Value> {
        let filter = self.get(name)?;
        filter(input, args)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn date_arg(value: &Value) -> Result<DateValue> {
    match value {
        Value::String(s) => DateValue::parse(s),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| Error::InvalidArgument(format!("Expected a timestamp, got {}", n)))
            .and_then(DateValue::from_unix_millis),
        other => Err(Error::InvalidArgument(format!(
            "Expected a date, got {}",
            other
        ))),
    }
}

fn readable_date(input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String(filters::readable_date(date_arg(input)?)))
}

fn html_date_string(input: &Value, _args: &[Value]) -> Result<Value> {
    Ok(Value::String(filters::html_date_string(date_arg(input)?)))
}

// Anything but a non-empty array yields `[]`, not an error.
fn head(input: &Value, args: &[Value]) -> Result<Value> {
    let items = match input {
        Value::Array(items) if !items.is_empty() => items,
        _ => return Ok(Value::Array(Vec::new())),
    };

    let n = args
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::InvalidArgument("head expects an integer count".to_string()))?;

    Ok(Value::Array(filters::head(items, n)))
}

fn min(input: &Value, args: &[Value]) -> Result<Value> {
    let values: Vec<&Value> = if input.is_null() {
        args.iter().collect()
    } else {
        std::iter::once(input).chain(args).collect()
    };

    if let Some(ints) = values.iter().map(|v| v.as_i64()).collect::<Option<Vec<_>>>() {
        return filters::min(&ints).map(Value::from);
    }

    let floats = values
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| Error::InvalidArgument(format!("min expects numbers, got {}", v)))
        })
        .collect::<Result<Vec<_>>>()?;

    let smallest = filters::min(&floats)?;
    Ok(serde_json::Number::from_f64(smallest)
        .map(Value::Number)
        .unwrap_or(Value::Null))
}

fn filter_denylist(input: &Value, _args: &[Value]) -> Result<Value> {
    match input {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .filter(|v| !v.as_str().is_some_and(tags::is_denylisted))
                .cloned()
                .collect(),
        )),
        other => Err(Error::InvalidArgument(format!(
            "filterDenylist expects a list of tags, got {}",
            other
        ))),
    }
}
