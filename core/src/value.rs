//! Host-side value tree.
//!
//! Editor hosts exchange Lisp-shaped data: `nil`, `t`, integers, strings,
//! symbols, lists and cons pairs. Structured results (contexts, schema
//! lists) become association lists here, at the boundary; inside the bridge
//! they stay typed structs.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::schema::SchemaEntry;
use crate::snapshot::{Composition, Context, Menu};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Nil,
    T,
    Int(i64),
    Str(String),
    Symbol(String),
    List(Vec<Value>),
    Cons(Box<Value>, Box<Value>),
}

impl Value {
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(name.to_string())
    }

    /// `(key . value)`
    pub fn pair(key: &str, value: Value) -> Self {
        Value::Cons(Box::new(Value::symbol(key)), Box::new(value))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Look up `key` in an association list.
    pub fn assoc(&self, key: &str) -> Option<&Value> {
        let Value::List(items) = self else {
            return None;
        };
        items.iter().find_map(|item| match item {
            Value::Cons(car, cdr) if matches!(&**car, Value::Symbol(s) if s == key) => Some(&**cdr),
            _ => None,
        })
    }

    /// Convert a JSON argument into a host value. `false` reads as `nil`.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Value::Nil,
            serde_json::Value::Bool(true) => Value::T,
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Str(n.to_string()),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::List(
                map.into_iter()
                    .map(|(k, v)| Value::pair(&k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Value::T
        } else {
            Value::Nil
        }
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Nil, Into::into)
    }
}

impl From<Composition> for Value {
    fn from(c: Composition) -> Self {
        Value::List(vec![
            Value::pair("length", c.length.into()),
            Value::pair("cursor-pos", c.cursor_pos.into()),
            Value::pair("sel-start", c.sel_start.into()),
            Value::pair("sel-end", c.sel_end.into()),
            Value::pair("preedit", c.preedit.into()),
            Value::pair("before-cursor", c.before_cursor.into()),
            Value::pair("after-cursor", c.after_cursor.into()),
        ])
    }
}

impl From<Menu> for Value {
    fn from(m: Menu) -> Self {
        let candidates = m.candidates.into_iter().map(|c| Value::Str(c.text)).collect();
        Value::List(vec![
            Value::pair("highlighted-candidate-index", m.highlighted_candidate_index.into()),
            Value::pair("last-page-p", m.is_last_page.into()),
            Value::pair("num-candidates", m.num_candidates.into()),
            Value::pair("page-no", m.page_no.into()),
            Value::pair("page-size", m.page_size.into()),
            Value::pair("candidates", Value::List(candidates)),
        ])
    }
}

impl From<Context> for Value {
    fn from(ctx: Context) -> Self {
        Value::List(vec![
            Value::pair("commit-text-preview", ctx.commit_text_preview.into()),
            Value::pair("composition", ctx.composition.into()),
            Value::pair("menu", ctx.menu.into()),
        ])
    }
}

impl From<SchemaEntry> for Value {
    fn from(entry: SchemaEntry) -> Self {
        Value::List(vec![Value::Str(entry.schema_id), Value::Str(entry.name)])
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_none(),
            Value::T => serializer.serialize_bool(true),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Str(s) | Value::Symbol(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Cons(car, cdr) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(car)?;
                seq.serialize_element(cdr)?;
                seq.end()
            }
        }
    }
}
