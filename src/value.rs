// ============================================================================
// spark-compose - Dynamic Values
// Loosely typed values carried by props, form fields and events
// ============================================================================
//
// Form fields and the checkbox group's `value` prop accept whatever the
// caller hands them, so they carry a `Value` and validate its shape at the
// edge. Display follows template-string conventions so error messages
// echo the offending value the way a caller wrote it.
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reactivity::equality::{ShallowEq, safe_equals_f64};

// =============================================================================
// SYMBOL
// =============================================================================

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(0);

/// An opaque identifier. Two symbols are equal only if one is a clone of
/// the other, whatever their descriptions.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Rc<str>,
}

impl Symbol {
    pub fn new(description: &str) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: Rc::from(description),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})#{}", self.description, self.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

// =============================================================================
// VALUE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Symbol(Symbol),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// What a `required` rule rejects: null, empty text, empty list, `false`.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Length used by length rules: characters of text, items of a list.
    pub fn length(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Symbol(sym) => serde_json::Value::String(sym.to_string()),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_null() {
                        write!(f, "{item}")?;
                    }
                }
                Ok(())
            }
            Value::Map(_) => f.write_str("[object Object]"),
            Value::Symbol(sym) => write!(f, "{sym}"),
        }
    }
}

impl ShallowEq for Value {
    fn shallow_eq(&self, other: &Self) -> bool {
        self == other
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// CHECKBOX VALUE
// =============================================================================

/// Identifier of a checkbox item: text, number, or symbol.
///
/// Numbers compare with SameValueZero semantics: `NaN` equals `NaN` and
/// `-0` equals `0`, so they behave as set members.
#[derive(Clone, Debug)]
pub enum CheckboxValue {
    Text(String),
    Number(f64),
    Symbol(Symbol),
}

impl CheckboxValue {
    /// The identifier inside `value`, if it is one.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(CheckboxValue::Text(s.clone())),
            Value::Number(n) => Some(CheckboxValue::Number(*n)),
            Value::Symbol(sym) => Some(CheckboxValue::Symbol(sym.clone())),
            _ => None,
        }
    }
}

impl PartialEq for CheckboxValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CheckboxValue::Text(a), CheckboxValue::Text(b)) => a == b,
            (CheckboxValue::Number(a), CheckboxValue::Number(b)) => safe_equals_f64(a, b),
            (CheckboxValue::Symbol(a), CheckboxValue::Symbol(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for CheckboxValue {}

impl Hash for CheckboxValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CheckboxValue::Text(s) => s.hash(state),
            CheckboxValue::Number(n) => {
                let canonical = if n.is_nan() {
                    f64::NAN.to_bits()
                } else if *n == 0.0 {
                    0.0f64.to_bits()
                } else {
                    n.to_bits()
                };
                canonical.hash(state);
            }
            CheckboxValue::Symbol(sym) => sym.hash(state),
        }
    }
}

impl fmt::Display for CheckboxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckboxValue::Text(s) => f.write_str(s),
            CheckboxValue::Number(n) => f.write_str(&format_number(*n)),
            CheckboxValue::Symbol(sym) => write!(f, "{sym}"),
        }
    }
}

impl From<CheckboxValue> for Value {
    fn from(value: CheckboxValue) -> Self {
        match value {
            CheckboxValue::Text(s) => Value::Text(s),
            CheckboxValue::Number(n) => Value::Number(n),
            CheckboxValue::Symbol(sym) => Value::Symbol(sym),
        }
    }
}

impl From<&str> for CheckboxValue {
    fn from(s: &str) -> Self {
        CheckboxValue::Text(s.to_string())
    }
}

impl From<String> for CheckboxValue {
    fn from(s: String) -> Self {
        CheckboxValue::Text(s)
    }
}

impl From<f64> for CheckboxValue {
    fn from(n: f64) -> Self {
        CheckboxValue::Number(n)
    }
}

impl From<i32> for CheckboxValue {
    fn from(n: i32) -> Self {
        CheckboxValue::Number(n.into())
    }
}

impl From<Symbol> for CheckboxValue {
    fn from(sym: Symbol) -> Self {
        CheckboxValue::Symbol(sym)
    }
}

// =============================================================================
// TESTS
// =============================================================================
