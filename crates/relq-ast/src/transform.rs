//! Transform strategy selection
//!
//! A postfix field list `r.{ ... }` lowers to one of six shapes. The
//! strategy is picked from what the fields contain, highest priority first:
//! windowed, ordered, aggregating, plain, rename, projection.

use crate::Segment;
use relq_bytecode::ExprKind;
use std::fmt;

/// The transform call a field list lowers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformKind {
    /// Extend or replace columns row by row
    Plain,
    /// At least one field folds over the input
    Aggregating,
    /// Ordering keys were given
    Ordered,
    /// At least one field uses a windowed operator
    Windowed,
}

impl TransformKind {
    /// Name of the evaluator entry point
    pub fn call_name(self) -> &'static str {
        match self {
            Self::Plain => "transform",
            Self::Aggregating => "aggregate",
            Self::Ordered => "transform_ordered",
            Self::Windowed => "transform_windowed",
        }
    }
}

/// What a field list lowers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Transform(TransformKind),
    /// Every column kept, at least one renamed
    Rename,
    /// Columns kept, none renamed or computed
    Projection,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(kind) => write!(f, "{}", kind.call_name()),
            Self::Rename => write!(f, "rename"),
            Self::Projection => write!(f, "project"),
        }
    }
}

/// One checked entry of a field list
#[derive(Debug, Clone, PartialEq)]
pub enum FieldItem {
    /// Keep a base column
    Project(String),
    /// Keep a base column under a new name
    Rename { from: String, to: String },
    /// Compute a column
    Extend(Segment),
}

impl FieldItem {
    /// Name of the output column
    pub fn output_name(&self) -> &str {
        match self {
            Self::Project(name) => name,
            Self::Rename { to, .. } => to,
            Self::Extend(segment) => &segment.name,
        }
    }
}

/// Pick the lowering for `items` over a base of degree `base_degree`
pub fn select_strategy(items: &[FieldItem], ordered: bool, base_degree: usize) -> Strategy {
    let extensions = || {
        items.iter().filter_map(|item| match item {
            FieldItem::Extend(segment) => Some(segment),
            _ => None,
        })
    };

    let strategy = if extensions().any(|s| s.kind == ExprKind::HasWin) {
        Strategy::Transform(TransformKind::Windowed)
    } else if ordered {
        Strategy::Transform(TransformKind::Ordered)
    } else if extensions().any(|s| s.kind == ExprKind::HasFold) {
        Strategy::Transform(TransformKind::Aggregating)
    } else if extensions().next().is_some() {
        Strategy::Transform(TransformKind::Plain)
    } else {
        let renames = items
            .iter()
            .filter(|item| matches!(item, FieldItem::Rename { .. }))
            .count();
        match (renames, items.len() == base_degree) {
            (0, _) => Strategy::Projection,
            (_, true) => Strategy::Rename,
            // renaming while dropping columns needs a real transform
            (_, false) => Strategy::Transform(TransformKind::Plain),
        }
    };
    log::debug!("field list of {} items lowers to {strategy}", items.len());
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Node, VarSource};
    use relq_types::{Column, DataType, Heading};
    use rstest::rstest;

    fn extend(kind: ExprKind) -> FieldItem {
        let lookup = Heading::from_columns([Column::new("a", DataType::Number)]).unwrap();
        let body = Node::variable("a", VarSource::Field, DataType::Number);
        let segment = match kind {
            ExprKind::Closed => Segment::new("x", Node::literal(1), Heading::new(), 0, false),
            ExprKind::Open => Segment::new("x", body, lookup, 0, false),
            ExprKind::HasFold => Segment::new("x", body, lookup, 1, false),
            ExprKind::HasWin => Segment::new("x", body, lookup, 1, true),
        };
        FieldItem::Extend(segment)
    }

    fn project(name: &str) -> FieldItem {
        FieldItem::Project(name.to_string())
    }

    fn rename(from: &str, to: &str) -> FieldItem {
        FieldItem::Rename {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[rstest]
    #[case(vec![extend(ExprKind::HasWin), extend(ExprKind::HasFold)], true, Strategy::Transform(TransformKind::Windowed))]
    #[case(vec![extend(ExprKind::HasFold)], true, Strategy::Transform(TransformKind::Ordered))]
    #[case(vec![extend(ExprKind::Open), extend(ExprKind::HasFold)], false, Strategy::Transform(TransformKind::Aggregating))]
    #[case(vec![project("a"), extend(ExprKind::Closed)], false, Strategy::Transform(TransformKind::Plain))]
    #[case(vec![rename("a", "x"), project("b")], false, Strategy::Rename)]
    #[case(vec![rename("a", "x")], false, Strategy::Transform(TransformKind::Plain))]
    #[case(vec![project("b")], false, Strategy::Projection)]
    fn strategy_priority(#[case] items: Vec<FieldItem>, #[case] ordered: bool, #[case] expected: Strategy) {
        assert_eq!(select_strategy(&items, ordered, 2), expected);
    }

    #[test]
    fn output_names() {
        assert_eq!(rename("a", "x").output_name(), "x");
        assert_eq!(extend(ExprKind::Open).output_name(), "x");
    }
}
