use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of [`LogValue`] indirections followed by [`Value::resolve`].
pub const MAX_RESOLVE_DEPTH: usize = 100;

/// A value that is computed only when a record is actually formatted.
///
/// Implementations may return another lazy value; resolution follows the
/// chain up to [`MAX_RESOLVE_DEPTH`] steps.
pub trait LogValue: Send + Sync {
    fn log_value(&self) -> Value;
}

impl<F> LogValue for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn log_value(&self) -> Value {
        self()
    }
}

/// Attribute value attached to a record.
#[derive(Clone)]
pub enum Value {
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Duration(Duration),
    Time(DateTime<Utc>),
    Group(Vec<Attr>),
    /// Arbitrary structured data.
    Any(serde_json::Value),
    Lazy(Arc<dyn LogValue>),
}

impl Value {
    /// Follow lazy values until a concrete one is reached.
    ///
    /// Self-referential providers are cut off after [`MAX_RESOLVE_DEPTH`]
    /// steps and resolve to an error string instead of looping forever.
    pub fn resolve(&self) -> Value {
        let mut current = self.clone();
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                Value::Lazy(provider) => current = provider.log_value(),
                resolved => return resolved,
            }
        }
        match current {
            Value::Lazy(_) => Value::String(format!(
                "!ERROR: LogValue resolution exceeded {} steps",
                MAX_RESOLVE_DEPTH
            )),
            resolved => resolved,
        }
    }

    pub fn is_empty_group(&self) -> bool {
        matches!(self, Value::Group(attrs) if attrs.is_empty())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Value::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Value::Group(v) => f.debug_tuple("Group").field(v).finish(),
            Value::Any(v) => f.debug_tuple("Any").field(v).finish(),
            Value::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

/// Plain rendering used by the text encoders.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolve() {
            Value::String(s) => f.write_str(&s),
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Duration(v) => write!(f, "{:?}", v),
            Value::Time(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::Any(v) => write!(f, "{}", v),
            Value::Group(attrs) => {
                for (i, attr) in attrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}={}", attr.key, attr.value)?;
                }
                Ok(())
            }
            Value::Lazy(_) => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.resolve() {
            Value::String(s) => serializer.serialize_str(&s),
            Value::Int(v) => serializer.serialize_i64(v),
            Value::Uint(v) => serializer.serialize_u64(v),
            Value::Float(v) => serializer.serialize_f64(v),
            Value::Bool(v) => serializer.serialize_bool(v),
            Value::Duration(v) => {
                serializer.serialize_u64(u64::try_from(v.as_nanos()).unwrap_or(u64::MAX))
            }
            Value::Time(v) => {
                serializer.serialize_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Any(v) => v.serialize(serializer),
            Value::Group(attrs) => AttrsMap(&attrs).serialize(serializer),
            Value::Lazy(_) => serializer.serialize_unit(),
        }
    }
}

/// Serializes attributes as one JSON object, keeping order and duplicates.
pub(crate) struct AttrsMap<'a>(pub &'a [Attr]);

impl Serialize for AttrsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for attr in self.0 {
            if attr.value.is_empty_group() {
                continue;
            }
            map.serialize_entry(&attr.key, &attr.value)?;
        }
        map.end()
    }
}

/// A key/value pair attached to a record. Keys need not be unique.
#[derive(Debug, Clone)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Attr { key: key.into(), value: value.into() }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Attr::new(key, Value::String(value.into()))
    }

    pub fn int(key: impl Into<String>, value: i64) -> Self {
        Attr::new(key, Value::Int(value))
    }

    pub fn uint(key: impl Into<String>, value: u64) -> Self {
        Attr::new(key, Value::Uint(value))
    }

    pub fn float(key: impl Into<String>, value: f64) -> Self {
        Attr::new(key, Value::Float(value))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Attr::new(key, Value::Bool(value))
    }

    pub fn duration(key: impl Into<String>, value: Duration) -> Self {
        Attr::new(key, Value::Duration(value))
    }

    pub fn time(key: impl Into<String>, value: DateTime<Utc>) -> Self {
        Attr::new(key, Value::Time(value))
    }

    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Attr::new(key, Value::Group(attrs))
    }

    pub fn any(key: impl Into<String>, value: serde_json::Value) -> Self {
        Attr::new(key, Value::Any(value))
    }

    pub fn lazy(key: impl Into<String>, provider: impl LogValue + 'static) -> Self {
        Attr::new(key, Value::Lazy(Arc::new(provider)))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint(v.into())
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Time(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Any(v)
    }
}

impl From<Vec<Attr>> for Value {
    fn from(v: Vec<Attr>) -> Self {
        Value::Group(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cycle;

    impl LogValue for Cycle {
        fn log_value(&self) -> Value {
            Value::Lazy(Arc::new(Cycle))
        }
    }

    #[test]
    fn lazy_values_resolve_recursively() {
        let inner = || Value::Int(7);
        let outer = move || Value::Lazy(Arc::new(inner));
        let attr = Attr::lazy("answer", outer);
        assert!(matches!(attr.value.resolve(), Value::Int(7)));
    }

    #[test]
    fn self_referential_lazy_value_is_cut_off() {
        let value = Value::Lazy(Arc::new(Cycle));
        match value.resolve() {
            Value::String(s) => assert!(s.starts_with("!ERROR")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn group_serializes_as_ordered_object() {
        let value = Value::Group(vec![
            Attr::string("method", "GET"),
            Attr::int("status", 200),
            Attr::group("empty", vec![]),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"method":"GET","status":200}"#);
    }

    #[test]
    fn duration_displays_human_readable() {
        let value = Value::Duration(Duration::from_millis(1500));
        assert_eq!(value.to_string(), "1.5s");
        assert_eq!(serde_json::to_string(&value).unwrap(), "1500000000");
    }
}
