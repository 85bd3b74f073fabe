//! Language-agnostic parameter trees.
//!
//! Front-ends describe entry-point arguments as a tree of tagged nodes;
//! the marshaller lowers the tree to a stack-loading prelude.

use serde::{Deserialize, Serialize};

/// Kind of a node in a parameter tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    Numeric,
    Boolean,
    Null,
    String,
    Composite,
}

/// A node in the argument tree handed to `Emulator::reset`. The root is
/// a composite whose children are the entry point's arguments in ABI
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamNode {
    pub kind: ParamKind,
    pub value: Option<String>,
    pub children: Vec<ParamNode>,
}

impl ParamNode {
    pub fn numeric(value: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::Numeric,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            kind: ParamKind::Boolean,
            value: Some(if value { "true" } else { "false" }.into()),
            children: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self {
            kind: ParamKind::Null,
            value: None,
            children: Vec::new(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: ParamKind::String,
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    pub fn composite(children: Vec<ParamNode>) -> Self {
        Self {
            kind: ParamKind::Composite,
            value: None,
            children,
        }
    }

    /// An empty argument list.
    pub fn empty() -> Self {
        Self::composite(Vec::new())
    }
}
