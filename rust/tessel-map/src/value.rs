use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};

/// The kind of a key or value, as reported by [`MapType`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// A boolean
    Bool,
    /// A signed or unsigned integer
    Integer,
    /// A UTF-8 string
    String,
    /// An opaque byte string
    Bytes,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::Bool => "Bool",
            Kind::Integer => "Integer",
            Kind::String => "String",
            Kind::Bytes => "Bytes",
        };
        write!(f, "{name}")
    }
}

/// Types that can report their [`Kind`].
pub trait Kinded {
    /// The kind of this key or value
    fn kind(&self) -> Kind;
}

macro_rules! kinded {
    ($kind:expr => $($type:ty),+) => {
        $(
            impl Kinded for $type {
                fn kind(&self) -> Kind {
                    $kind
                }
            }
        )+
    };
}

kinded!(Kind::Bool => bool);
kinded!(Kind::Integer => u8, u16, u32, u64, i8, i16, i32, i64);
kinded!(Kind::String => String);
kinded!(Kind::Bytes => Vec<u8>);

/// A closed set of primitive values, for maps whose keys or values are not
/// all of one Rust type. Values of different kinds order by kind first
/// (`Bool < Integer < String < Bytes`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    /// A boolean
    Bool(bool),
    /// An integer
    Integer(i64),
    /// A UTF-8 string
    String(String),
    /// An opaque byte string
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl Kinded for Value {
    fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Integer(_) => Kind::Integer,
            Value::String(_) => Kind::String,
            Value::Bytes(_) => Kind::Bytes,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

/// The kinds of keys and values a map holds. Purely descriptive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapType {
    /// Kinds of the keys
    pub keys: BTreeSet<Kind>,
    /// Kinds of the values
    pub values: BTreeSet<Kind>,
}

impl Display for MapType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn union(kinds: &BTreeSet<Kind>) -> String {
            match kinds.len() {
                1 => kinds.iter().map(Kind::to_string).collect(),
                _ => format!(
                    "Union<{}>",
                    kinds.iter().map(Kind::to_string).collect::<Vec<_>>().join(", ")
                ),
            }
        }
        write!(f, "Map<{}, {}>", union(&self.keys), union(&self.values))
    }
}
