//! `*` / `allbut` field list expansion
//!
//! In an all-but list the named columns are the ones to *drop*; every other
//! base column is carried over, renamed or replaced when the list says so.

use relq_diagnostics::{ErrorCode, RQ0112, RQ0114};
use relq_types::Heading;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllButError {
    #[error("unknown column '{name}'")]
    UnknownColumn { name: String },

    #[error("column '{name}' is dropped, renamed or replaced more than once")]
    Conflict { name: String },
}

impl AllButError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownColumn { .. } => RQ0112,
            Self::Conflict { .. } => RQ0114,
        }
    }
}

/// An entry as written in the list
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec<T> {
    Project(String),
    Rename { from: String, to: String },
    Extend(String, T),
}

/// An entry of the expanded list
#[derive(Debug, Clone, PartialEq)]
pub enum Expanded<T> {
    Drop(String),
    Keep(String),
    Rename { from: String, to: String },
    Extend(String, T),
}

impl<T> Expanded<T> {
    /// Name in the output heading; drops have none
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Drop(_) => None,
            Self::Keep(name) | Self::Extend(name, _) => Some(name),
            Self::Rename { to, .. } => Some(to),
        }
    }
}

/// Expand `fields` against `base`
///
/// Output order: drops, then base columns in base order (kept, renamed or
/// replaced), then extensions naming new columns.
pub fn expand<T>(base: &Heading, fields: Vec<FieldSpec<T>>) -> Result<Vec<Expanded<T>>, AllButError> {
    let mut drops = Vec::new();
    let mut renames = Vec::new();
    let mut extensions = Vec::new();
    let mut claimed: Vec<String> = Vec::new();

    let mut claim = |name: &str| {
        if claimed.iter().any(|c| c == name) {
            return Err(AllButError::Conflict { name: name.to_string() });
        }
        claimed.push(name.to_string());
        Ok(())
    };

    for field in fields {
        match field {
            FieldSpec::Project(name) => {
                if !base.contains(&name) {
                    return Err(AllButError::UnknownColumn { name });
                }
                claim(&name)?;
                drops.push(name);
            }
            FieldSpec::Rename { from, to } => {
                if !base.contains(&from) {
                    return Err(AllButError::UnknownColumn { name: from });
                }
                claim(&from)?;
                renames.push((from, to));
            }
            FieldSpec::Extend(name, payload) => {
                if base.contains(&name) {
                    claim(&name)?;
                }
                extensions.push(Some((name, payload)));
            }
        }
    }

    let mut out: Vec<Expanded<T>> = drops.iter().cloned().map(Expanded::Drop).collect();
    for column in base.names() {
        if drops.iter().any(|d| d == column) {
            continue;
        }
        if let Some((from, to)) = renames.iter().find(|(from, _)| from == column) {
            out.push(Expanded::Rename {
                from: from.clone(),
                to: to.clone(),
            });
        } else if let Some(slot) = extensions
            .iter_mut()
            .find(|e| matches!(e, Some((name, _)) if name == column))
        {
            if let Some((name, payload)) = slot.take() {
                out.push(Expanded::Extend(name, payload));
            }
        } else {
            out.push(Expanded::Keep(column.to_string()));
        }
    }
    out.extend(
        extensions
            .into_iter()
            .flatten()
            .map(|(name, payload)| Expanded::Extend(name, payload)),
    );
    Ok(out)
}
