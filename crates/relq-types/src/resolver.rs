//! Overload resolution and type checking
//!
//! `check_type` picks the first link of a symbol's overload chain whose
//! declared argument types accept the actual types, merges headings for
//! relational operators and resolves placeholder return types.

use thiserror::Error;

use crate::{CallInfo, DataType, Heading, HeadingError, MergePolicy, Symbol};
use relq_diagnostics::{ErrorCode, RQ0103, RQ0104, RQ0105, RQ0106, RQ0113, RQ0301};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("'{name}' expected {expected} arguments, found {found}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch for '{name}' with arguments ({args})")]
    TypeMismatch { name: String, args: String },

    #[error("duplicate column '{column}' in result of '{name}'")]
    DuplicateColumn { name: String, column: String },

    #[error("heading mismatch for '{name}': {left} vs {right}")]
    HeadingMismatch {
        name: String,
        left: Heading,
        right: Heading,
    },

    #[error("'{name}' is not callable")]
    NotCallable { name: String },

    #[error("cannot resolve the return type of '{name}' without arguments")]
    UnresolvedReturn { name: String },
}

impl TypeError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::WrongArgumentCount { .. } => RQ0104,
            Self::TypeMismatch { .. } => RQ0103,
            Self::DuplicateColumn { .. } => RQ0105,
            Self::HeadingMismatch { .. } => RQ0106,
            Self::NotCallable { .. } => RQ0113,
            Self::UnresolvedReturn { .. } => RQ0301,
        }
    }

    /// A compiler defect rather than a user error
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::UnresolvedReturn { .. })
    }
}

pub type TypeResult<T> = Result<T, TypeError>;

/// The outcome of a successful check
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub data_type: DataType,
    pub call: CallInfo,
}

/// Whether a value of type `actual` may be passed where `declared` is expected
pub fn type_match(declared: &DataType, actual: &DataType) -> bool {
    declared == actual
        || matches!(declared, DataType::Any | DataType::Code)
        || actual.is_subtype_of(declared)
        || (matches!(declared, DataType::Table) && actual.is_relation())
        || (matches!(declared, DataType::Row) && actual.is_tuple())
        || (matches!(declared, DataType::Ordered) && actual.is_ordered())
        || (matches!(declared, DataType::Ordinal) && actual.is_ordinal())
}

fn link_matches(link: &CallInfo, actuals: &[DataType]) -> bool {
    let fixed = link.args.len();
    if actuals.len() < fixed {
        return false;
    }
    let fixed_ok = link
        .args
        .iter()
        .zip(actuals)
        .all(|(arg, actual)| type_match(&arg.data_type, actual));
    let rest_ok = match &link.variadic {
        Some(element) => actuals[fixed..].iter().all(|a| type_match(element, a)),
        None => actuals.len() == fixed,
    };
    fixed_ok && rest_ok
}

fn describe(actuals: &[DataType]) -> String {
    actuals
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a call of `symbol` with `actuals`
pub fn check_type(symbol: &Symbol, actuals: &[DataType]) -> TypeResult<Resolved> {
    let links = symbol.links();
    let Some(first) = links.first() else {
        return Err(TypeError::NotCallable {
            name: symbol.name.clone(),
        });
    };

    // 1. arity
    let arity_ok = if first.is_variadic() {
        actuals.len() >= first.arity()
    } else {
        actuals.len() == first.arity()
    };
    if !arity_ok {
        return Err(TypeError::WrongArgumentCount {
            name: symbol.name.clone(),
            expected: first.arity(),
            found: actuals.len(),
        });
    }

    // 2. comparison of identical types
    let chosen = if symbol.is_comparison() && actuals.len() == 2 && actuals[0] == actuals[1] {
        let mut call = first.clone();
        for (arg, actual) in call.args.iter_mut().zip(actuals) {
            arg.data_type = actual.clone();
        }
        call
    } else {
        // 3. first matching link
        links
            .iter()
            .find(|link| link_matches(link, actuals))
            .cloned()
            .ok_or_else(|| TypeError::TypeMismatch {
                name: symbol.name.clone(),
                args: describe(actuals),
            })?
    };

    // 5. heading merge for relational operators
    if let Some(policy) = symbol.join {
        if let Some(merged) = merge_headings(&symbol.name, policy, actuals)? {
            let data_type = match policy {
                MergePolicy::Compare => chosen.return_type.clone(),
                _ => DataType::Relation(merged),
            };
            return Ok(Resolved {
                data_type,
                call: chosen,
            });
        }
    }

    // 7. placeholder return types
    let data_type = resolve_return(&symbol.name, &chosen.return_type, actuals)?;
    log::trace!("resolved {} as {chosen} -> {data_type}", symbol.name);
    Ok(Resolved {
        data_type,
        call: chosen,
    })
}

/// Merge the headings of relational arguments according to `policy`
///
/// Returns `None` when the arguments are not all relations.
fn merge_headings(name: &str, policy: MergePolicy, actuals: &[DataType]) -> TypeResult<Option<Heading>> {
    let headings: Vec<&Heading> = actuals
        .iter()
        .filter_map(|a| match a {
            DataType::Relation(h) => Some(h),
            _ => None,
        })
        .collect();
    if headings.len() != actuals.len() || headings.len() < 2 {
        return Ok(None);
    }

    let duplicate = |e: HeadingError| match e {
        HeadingError::DuplicateColumn { name: column } | HeadingError::UnknownColumn { name: column } => {
            TypeError::DuplicateColumn {
                name: name.to_string(),
                column,
            }
        }
    };

    let left = headings[0];
    let merged = match policy {
        MergePolicy::Join => {
            let mut out = left.clone();
            for h in &headings[1..] {
                out = out.union(h).map_err(duplicate)?;
            }
            out
        }
        MergePolicy::Compose => left.compose(headings[1]).map_err(duplicate)?,
        MergePolicy::Left => {
            left.union(headings[1]).map_err(duplicate)?;
            left.clone()
        }
        MergePolicy::Same | MergePolicy::Compare => {
            if let Some(other) = headings[1..].iter().find(|h| **h != left) {
                return Err(TypeError::HeadingMismatch {
                    name: name.to_string(),
                    left: left.clone(),
                    right: (*other).clone(),
                });
            }
            left.clone()
        }
    };
    Ok(Some(merged))
}

/// Replace a placeholder return type by the first argument's type
pub fn resolve_return(name: &str, declared: &DataType, actuals: &[DataType]) -> TypeResult<DataType> {
    if !declared.is_placeholder() {
        return Ok(declared.clone());
    }
    actuals
        .first()
        .cloned()
        .ok_or_else(|| TypeError::UnresolvedReturn {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builtins, CallKind, Column, OverloadChain, SymbolKind, UserType};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn op(name: &str) -> &'static Symbol {
        Builtins::get().lookup(name).unwrap()
    }

    fn rel(cols: &[(&str, DataType)]) -> DataType {
        DataType::relation(
            Heading::from_columns(cols.iter().map(|(n, t)| Column::new(*n, t.clone()))).unwrap(),
        )
    }

    #[rstest]
    #[case("+", vec![DataType::Number, DataType::Number], DataType::Number)]
    #[case("+", vec![DataType::Time, DataType::Number], DataType::Time)]
    #[case("&", vec![DataType::Text, DataType::Text], DataType::Text)]
    #[case("<", vec![DataType::Text, DataType::Text], DataType::Bool)]
    #[case("succ", vec![DataType::Time], DataType::Time)]
    #[case("max", vec![DataType::Text], DataType::Text)]
    #[case("concat", vec![DataType::Text, DataType::Text, DataType::Text], DataType::Text)]
    fn test_scalar_resolution(#[case] name: &str, #[case] args: Vec<DataType>, #[case] expected: DataType) {
        assert_eq!(check_type(op(name), &args).unwrap().data_type, expected);
    }

    #[test]
    fn test_arity_error() {
        let err = check_type(op("length"), &[]).unwrap_err();
        assert_eq!(err.to_string(), "'length' expected 1 arguments, found 0");
    }

    #[test]
    fn test_type_mismatch_names_symbol() {
        let err = check_type(op("+"), &[DataType::Number, DataType::Text]).unwrap_err();
        assert!(matches!(&err, TypeError::TypeMismatch { name, .. } if name == "+"));
        assert_eq!(err.code(), RQ0103);
    }

    #[test]
    fn test_comparison_identity_shortcut() {
        let user = DataType::user(UserType::new("point", Heading::new()));
        let resolved = check_type(op("="), &[user.clone(), user.clone()]).unwrap();
        assert_eq!(resolved.data_type, DataType::Bool);
        assert_eq!(resolved.call.args[0].data_type, user);
    }

    #[test]
    fn test_join_merges_headings() {
        let a = rel(&[("k", DataType::Number), ("x", DataType::Text)]);
        let b = rel(&[("k", DataType::Number), ("y", DataType::Bool)]);
        let resolved = check_type(op("join"), &[a, b]).unwrap();
        assert_eq!(
            resolved.data_type,
            rel(&[("k", DataType::Number), ("x", DataType::Text), ("y", DataType::Bool)])
        );
    }

    #[test]
    fn test_join_duplicate_column() {
        let a = rel(&[("k", DataType::Number)]);
        let b = rel(&[("k", DataType::Text)]);
        let err = check_type(op("join"), &[a, b]).unwrap_err();
        assert_eq!(err.code(), RQ0105);
    }

    #[test]
    fn test_union_heading_mismatch() {
        let a = rel(&[("k", DataType::Number)]);
        let b = rel(&[("j", DataType::Number)]);
        let err = check_type(op("union"), &[a, b]).unwrap_err();
        assert!(matches!(err, TypeError::HeadingMismatch { .. }));
    }

    #[test]
    fn test_semijoin_keeps_left() {
        let a = rel(&[("k", DataType::Number), ("x", DataType::Text)]);
        let b = rel(&[("k", DataType::Number), ("y", DataType::Bool)]);
        assert_eq!(check_type(op("semijoin"), &[a.clone(), b]).unwrap().data_type, a);
    }

    #[test]
    fn test_three_argument_placeholder_uses_first_argument() {
        let resolved = check_type(op("clamp"), &[DataType::Number, DataType::Number, DataType::Number]).unwrap();
        assert_eq!(resolved.data_type, DataType::Number);

        // the first argument wins even when later ones are other ordered kinds
        let resolved = check_type(op("clamp"), &[DataType::Text, DataType::Number, DataType::Time]).unwrap();
        assert_eq!(resolved.data_type, DataType::Text);
    }

    #[test]
    fn test_unresolved_return_is_internal() {
        let chain = OverloadChain::single(CallInfo::new("mystery", DataType::Unknown, CallKind::Fixed));
        let sym = Symbol::callable("mystery", SymbolKind::Operator, chain);
        let err = check_type(&sym, &[]).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let args = [DataType::Time, DataType::Number];
        let first = check_type(op("-"), &args).unwrap();
        for _ in 0..10 {
            assert_eq!(check_type(op("-"), &args).unwrap(), first);
        }
    }

    #[test]
    fn test_subtype_matches_declared_supertype() {
        let shape = DataType::user(UserType::new("shape", Heading::new()));
        let circle = DataType::user(UserType::new("circle", Heading::new()).with_supertype(shape.clone()));
        let chain = OverloadChain::single(CallInfo::new("area", DataType::Number, CallKind::Deferred).arg("s", shape));
        let sym = Symbol::callable("area", SymbolKind::Deferred, chain);
        assert_eq!(check_type(&sym, &[circle]).unwrap().data_type, DataType::Number);
    }
}
