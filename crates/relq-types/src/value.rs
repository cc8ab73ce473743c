//! Literal values
//!
//! These are the values the compiler can embed in bytecode as literals and
//! the values an evaluator hands back after running a statement.

use crate::{Column, DataType, Heading};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Format used for time literals and their display
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Number(Decimal),
    Text(String),
    Binary(Vec<u8>),
    Time(NaiveDateTime),
    /// Named component values, in heading order
    Tuple(Vec<(String, Value)>),
    Relation {
        heading: Heading,
        rows: Vec<Vec<Value>>,
    },
    /// A bare heading, used as an operand of constructors
    Heading(Heading),
    Void,
}

impl Value {
    pub fn number(n: impl Into<Decimal>) -> Self {
        Self::Number(n.into())
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Type of the value as the compiler sees it
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Bool(_) => DataType::Bool,
            Self::Number(_) => DataType::Number,
            Self::Text(_) => DataType::Text,
            Self::Binary(_) => DataType::Binary,
            Self::Time(_) => DataType::Time,
            Self::Tuple(fields) => {
                let mut heading = Heading::new();
                for (name, value) in fields {
                    heading.insert_if_absent(Column::new(name.clone(), value.data_type()));
                }
                DataType::Tuple(heading)
            }
            Self::Relation { heading, .. } => DataType::Relation(heading.clone()),
            // headings are operands, never standalone values
            Self::Heading(_) => DataType::Any,
            Self::Void => DataType::Void,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Binary(bytes) => {
                write!(f, "0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::Time(t) => write!(f, "t'{}'", t.format(TIME_FORMAT)),
            Self::Tuple(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} := {value}")?;
                }
                write!(f, "}}")
            }
            Self::Relation { heading, rows } => {
                write!(f, "{{")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{{")?;
                    for (j, (column, value)) in heading.iter().zip(row).enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{} := {value}", column.name)?;
                    }
                    write!(f, "}}")?;
                }
                write!(f, "}}")
            }
            Self::Heading(h) => write!(f, "{h}"),
            Self::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_display() {
        assert_eq!(Value::number(Decimal::new(150, 2)).to_string(), "1.5");
        assert_eq!(Value::text("it's").to_string(), "'it''s'");
        assert_eq!(Value::Binary(vec![0xde, 0xad]).to_string(), "0xdead");
        let t = NaiveDateTime::parse_from_str("2024-01-31 12:00:00", TIME_FORMAT).unwrap();
        assert_eq!(Value::Time(t).to_string(), "t'2024-01-31 12:00:00'");
    }

    #[test]
    fn test_tuple_type() {
        let v = Value::Tuple(vec![
            ("a".into(), Value::number(1)),
            ("b".into(), Value::text("x")),
        ]);
        let DataType::Tuple(h) = v.data_type() else {
            panic!("expected a tuple type");
        };
        assert_eq!(h.get("b").map(|c| &c.data_type), Some(&DataType::Text));
    }
}
