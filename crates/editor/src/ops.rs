use std::ops::Range;

use crate::core::{AttrPatch, Marks, Node, Selection};

/// Child indexes from the document root down to a node.
pub type Path = Vec<usize>;

/// A single document edit. Applying one yields its inverse, which is what the
/// undo history records.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Insert `text` into the text leaf at `path`, at a byte offset.
    InsertText { path: Path, offset: usize, text: String },
    /// Remove a byte range from the text leaf at `path`.
    RemoveText { path: Path, range: Range<usize> },
    /// Insert `node` so that it ends up at `path`.
    InsertNode { path: Path, node: Node },
    RemoveNode { path: Path },
    SetNodeAttrs { path: Path, patch: AttrPatch },
    /// Replace every mark on the text leaf at `path`.
    SetTextMarks { path: Path, marks: Marks },
}

impl Op {
    pub fn replace_node(path: &[usize], node: Node) -> [Op; 2] {
        [
            Op::RemoveNode {
                path: path.to_vec(),
            },
            Op::InsertNode {
                path: path.to_vec(),
                node,
            },
        ]
    }
}

/// Ops committed as one undo step. `source` names the command for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub ops: Vec<Op>,
    pub selection_after: Option<Selection>,
    pub source: Option<String>,
}

impl Transaction {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            ops,
            selection_after: None,
            source: None,
        }
    }

    pub fn selection_after(mut self, selection: Selection) -> Self {
        self.selection_after = Some(selection);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
