//! relq type system
//!
//! `DataType` is a value-equal description of every type the compiler can
//! assign. Relational types carry a `Heading`; placeholder kinds (`Unknown`,
//! `Table`, `Row`, `Ordered`, `Ordinal`, `Any`) only appear in builtin
//! signatures and must be resolved before a node is finalized.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// The complete relq type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // === Scalars ===
    Bool,
    /// Arbitrary precision decimal
    Number,
    Text,
    Binary,
    /// Date and time of day
    Time,

    // === Relational ===
    Tuple(Heading),
    Relation(Heading),
    User(Box<UserType>),

    /// A compiled code segment passed as a value
    Code,
    /// The type of statements that produce nothing
    Void,

    // === Placeholders ===
    /// Return type resolved from the first argument
    Unknown,
    /// Any relation
    Table,
    /// Any tuple
    Row,
    /// Number, text or time
    Ordered,
    /// Number or time
    Ordinal,
    /// Anything at all
    Any,
}

impl DataType {
    pub fn tuple(heading: Heading) -> Self {
        Self::Tuple(heading)
    }

    pub fn relation(heading: Heading) -> Self {
        Self::Relation(heading)
    }

    pub fn user(user: UserType) -> Self {
        Self::User(Box::new(user))
    }

    /// Look up a scalar type by its source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "bool" => Some(Self::Bool),
            "number" => Some(Self::Number),
            "text" => Some(Self::Text),
            "binary" => Some(Self::Binary),
            "time" => Some(Self::Time),
            _ => None,
        }
    }

    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Number | Self::Text | Self::Time)
    }

    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Number | Self::Time)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            Self::Unknown | Self::Table | Self::Row | Self::Ordered | Self::Ordinal | Self::Any
        )
    }

    /// True when neither this type nor any nested column type is a placeholder
    pub fn is_concrete(&self) -> bool {
        match self {
            Self::Tuple(h) | Self::Relation(h) => h.iter().all(|c| c.data_type.is_concrete()),
            Self::User(u) => u.heading.iter().all(|c| c.data_type.is_concrete()),
            other => !other.is_placeholder(),
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Tuple(_))
    }

    /// The heading of a tuple, relation or user type
    pub fn heading(&self) -> Option<&Heading> {
        match self {
            Self::Tuple(h) | Self::Relation(h) => Some(h),
            Self::User(u) => Some(&u.heading),
            _ => None,
        }
    }

    /// Walk the declared supertype chain of a user type
    pub fn is_subtype_of(&self, other: &DataType) -> bool {
        let Self::User(user) = self else {
            return false;
        };
        let mut next = user.supertype.as_deref();
        while let Some(ty) = next {
            if ty == other {
                return true;
            }
            next = match ty {
                Self::User(u) => u.supertype.as_deref(),
                _ => None,
            };
        }
        false
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Number => write!(f, "number"),
            Self::Text => write!(f, "text"),
            Self::Binary => write!(f, "binary"),
            Self::Time => write!(f, "time"),
            Self::Tuple(h) => write!(f, "tup{h}"),
            Self::Relation(h) => write!(f, "rel{h}"),
            Self::User(u) => write!(f, "{}", u.name),
            Self::Code => write!(f, "code"),
            Self::Void => write!(f, "void"),
            Self::Unknown => write!(f, "?unknown"),
            Self::Table => write!(f, "?table"),
            Self::Row => write!(f, "?row"),
            Self::Ordered => write!(f, "?ordered"),
            Self::Ordinal => write!(f, "?ordinal"),
            Self::Any => write!(f, "?any"),
        }
    }
}

/// A named user type with components and an optional supertype
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserType {
    pub name: String,
    pub heading: Heading,
    pub supertype: Option<Box<DataType>>,
}

impl UserType {
    pub fn new(name: impl Into<String>, heading: Heading) -> Self {
        Self {
            name: name.into(),
            heading,
            supertype: None,
        }
    }

    pub fn with_supertype(mut self, supertype: DataType) -> Self {
        self.supertype = Some(Box::new(supertype));
        self
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeadingError {
    #[error("duplicate column '{name}'")]
    DuplicateColumn { name: String },

    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },
}

/// A name-unique set of columns
///
/// Equality and hashing ignore column order. Insertion order is kept for
/// display and as the base order of all-but expansion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Heading {
    columns: IndexMap<String, Column>,
}

impl Heading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: impl IntoIterator<Item = Column>) -> Result<Self, HeadingError> {
        let mut heading = Self::new();
        for column in columns {
            heading.push(column)?;
        }
        Ok(heading)
    }

    /// Append a column, failing if the name is taken
    pub fn push(&mut self, column: Column) -> Result<(), HeadingError> {
        if self.columns.contains_key(&column.name) {
            return Err(HeadingError::DuplicateColumn { name: column.name });
        }
        self.columns.insert(column.name.clone(), column);
        Ok(())
    }

    pub fn with(mut self, column: Column) -> Result<Self, HeadingError> {
        self.push(column)?;
        Ok(self)
    }

    pub fn degree(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Insert a column unless one with the same name is already present
    pub fn insert_if_absent(&mut self, column: Column) {
        if !self.columns.contains_key(&column.name) {
            self.columns.insert(column.name.clone(), column);
        }
    }

    /// Columns of both headings; shared names must agree on type
    pub fn union(&self, other: &Heading) -> Result<Heading, HeadingError> {
        let mut out = self.clone();
        for column in other.iter() {
            match out.get(&column.name) {
                Some(existing) if existing.data_type != column.data_type => {
                    return Err(HeadingError::DuplicateColumn {
                        name: column.name.clone(),
                    });
                }
                Some(_) => {}
                None => out.push(column.clone())?,
            }
        }
        Ok(out)
    }

    /// Columns of both headings minus the shared ones
    pub fn compose(&self, other: &Heading) -> Result<Heading, HeadingError> {
        let joined = self.union(other)?;
        Ok(Heading {
            columns: joined
                .columns
                .into_iter()
                .filter(|(name, _)| !(self.contains(name) && other.contains(name)))
                .collect(),
        })
    }

    /// Keep only the named columns, in the order given
    pub fn project<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Heading, HeadingError> {
        let mut out = Heading::new();
        for name in names {
            let column = self.get(name).ok_or_else(|| HeadingError::UnknownColumn {
                name: name.to_string(),
            })?;
            out.push(column.clone())?;
        }
        Ok(out)
    }
}

impl PartialEq for Heading {
    fn eq(&self, other: &Self) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .all(|(name, col)| other.columns.get(name) == Some(col))
    }
}

impl Eq for Heading {}

impl Hash for Heading {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let mut sorted: Vec<&Column> = self.columns.values().collect();
        sorted.sort_by(|a, b| a.name.cmp(&b.name));
        sorted.len().hash(state);
        for column in sorted {
            column.hash(state);
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, column) in self.columns.values().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{column}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn heading(cols: &[(&str, DataType)]) -> Heading {
        Heading::from_columns(cols.iter().map(|(n, t)| Column::new(*n, t.clone()))).unwrap()
    }

    fn hash_of(h: &Heading) -> u64 {
        let mut hasher = DefaultHasher::new();
        h.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_heading_equality_ignores_order() {
        let a = heading(&[("x", DataType::Number), ("y", DataType::Text)]);
        let b = heading(&[("y", DataType::Text), ("x", DataType::Number)]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_eq!(a.to_string(), "{x:number,y:text}");
    }

    #[test]
    fn test_heading_rejects_duplicates() {
        let err = Heading::from_columns([
            Column::new("x", DataType::Number),
            Column::new("x", DataType::Text),
        ])
        .unwrap_err();
        assert_eq!(err, HeadingError::DuplicateColumn { name: "x".into() });
    }

    #[test]
    fn test_union_and_compose() {
        let a = heading(&[("k", DataType::Number), ("x", DataType::Text)]);
        let b = heading(&[("k", DataType::Number), ("y", DataType::Bool)]);
        assert_eq!(a.union(&b).unwrap().degree(), 3);
        assert_eq!(a.compose(&b).unwrap(), heading(&[("x", DataType::Text), ("y", DataType::Bool)]));

        let c = heading(&[("k", DataType::Text)]);
        assert!(matches!(a.union(&c), Err(HeadingError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_placeholder_predicates() {
        assert!(DataType::Text.is_ordered());
        assert!(!DataType::Text.is_ordinal());
        assert!(DataType::Time.is_ordinal());
        assert!(!DataType::relation(heading(&[("a", DataType::Number)])).is_placeholder());
        assert!(!DataType::relation(heading(&[("a", DataType::Unknown)])).is_concrete());
    }

    #[test]
    fn test_subtype_chain() {
        let shape = DataType::user(UserType::new("shape", Heading::new()));
        let polygon = DataType::user(UserType::new("polygon", Heading::new()).with_supertype(shape.clone()));
        let square = DataType::user(UserType::new("square", Heading::new()).with_supertype(polygon.clone()));
        assert!(square.is_subtype_of(&shape));
        assert!(square.is_subtype_of(&polygon));
        assert!(!shape.is_subtype_of(&square));
    }
}
