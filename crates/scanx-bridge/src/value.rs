// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Values carried by method-channel messages.

/// A value as the standard message codec models it.
///
/// Maps keep their entries in wire order; keys may be any value.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    /// A `Uint8List` on the Dart side, `byte[]` on the JVM side.
    Bytes(Vec<u8>),
    List(Vec<MessageValue>),
    Map(Vec<(MessageValue, MessageValue)>),
}

impl MessageValue {
    /// Look up a string key in a map. `None` for non-maps and missing keys.
    pub fn get(&self, key: &str) -> Option<&MessageValue> {
        match self {
            MessageValue::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                MessageValue::String(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MessageValue::Null)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            MessageValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageValue::Null => "null",
            MessageValue::Bool(_) => "bool",
            MessageValue::Int32(_) => "int32",
            MessageValue::Int64(_) => "int64",
            MessageValue::Float64(_) => "float64",
            MessageValue::String(_) => "string",
            MessageValue::Bytes(_) => "bytes",
            MessageValue::List(_) => "list",
            MessageValue::Map(_) => "map",
        }
    }

    /// Build a map with string keys.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, MessageValue)>) -> Self {
        MessageValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (MessageValue::String(k.into()), v))
                .collect(),
        )
    }
}

impl From<Vec<u8>> for MessageValue {
    fn from(bytes: Vec<u8>) -> Self {
        MessageValue::Bytes(bytes)
    }
}

impl From<&str> for MessageValue {
    fn from(s: &str) -> Self {
        MessageValue::String(s.to_owned())
    }
}
