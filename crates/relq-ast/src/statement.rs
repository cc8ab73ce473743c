//! Top-level statements

use crate::{AstError, AstResult, Node, Segment};
use relq_types::{CallInfo, DataType, UserType};

/// One compiled top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An expression whose value is the statement result
    Expression(Node),
    /// `name := expr`, binding a catalog variable
    Assign(Assignment),
    /// `def name(...) => expr`
    Define(Definition),
    /// `type name(...)`
    TypeDef(UserType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    /// The overload being added
    pub call: CallInfo,
    pub body: Segment,
}

impl Statement {
    /// Result type; definitions and assignments produce nothing
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Expression(node) => node.data_type(),
            Self::Assign(_) | Self::Define(_) | Self::TypeDef(_) => DataType::Void,
        }
    }

    pub fn root(&self) -> Option<&Node> {
        match self {
            Self::Expression(node) => Some(node),
            Self::Assign(a) => Some(&a.value),
            Self::Define(d) => Some(&d.body.body),
            Self::TypeDef(_) => None,
        }
    }

    /// Check that no node kept a placeholder type
    pub fn finalize(&self) -> AstResult {
        match self.root() {
            Some(root) => check_concrete(root),
            None => Ok(()),
        }
    }
}

fn check_concrete(node: &Node) -> AstResult {
    let data_type = node.data_type();
    if !data_type.is_concrete() {
        return Err(AstError::Placeholder {
            shape: node.shape(),
            data_type,
        });
    }
    node.children().into_iter().try_for_each(check_concrete)
}
