//! In-memory node arena shared by all handles of one store file.

use crate::core::DatasetLayout;
use crate::util::{Element, ElementType, Value};

/// Index of a node inside the arena.
pub(crate) type NodeId = usize;

/// Typed payload of an array dataset.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ArrayBuf {
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Apply `$body` to the vector inside any `ArrayBuf` variant.
macro_rules! with_buf {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            ArrayBuf::Uint8($v) => $body,
            ArrayBuf::Uint16($v) => $body,
            ArrayBuf::Int32($v) => $body,
            ArrayBuf::Float32($v) => $body,
            ArrayBuf::Float64($v) => $body,
        }
    };
}

fn convert<S: Element, D: Element>(src: &[S], dst: &mut [D]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = D::from_f64(s.to_f64());
    }
}

impl ArrayBuf {
    /// A zero-filled buffer of `len` elements.
    pub fn zeroed(element: ElementType, len: usize) -> Self {
        match element {
            ElementType::Uint8 => Self::Uint8(vec![0; len]),
            ElementType::Uint16 => Self::Uint16(vec![0; len]),
            ElementType::Int32 => Self::Int32(vec![0; len]),
            ElementType::Float32 => Self::Float32(vec![0.0; len]),
            ElementType::Float64 => Self::Float64(vec![0.0; len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Self::Uint8(_) => ElementType::Uint8,
            Self::Uint16(_) => ElementType::Uint16,
            Self::Int32(_) => ElementType::Int32,
            Self::Float32(_) => ElementType::Float32,
            Self::Float64(_) => ElementType::Float64,
        }
    }

    pub fn len(&self) -> usize {
        with_buf!(self, v => v.len())
    }

    /// Copy into `out`, converting element type. Lengths must match.
    pub fn read_into<T: Element>(&self, out: &mut [T]) {
        with_buf!(self, v => convert(v.as_slice(), out))
    }

    /// Overwrite from `src`, converting element type. Lengths must match.
    pub fn write_from<T: Element>(&mut self, src: &[T]) {
        with_buf!(self, v => convert(src, v.as_mut_slice()))
    }
}

/// Array dataset: creation layout plus current contents.
#[derive(Clone, Debug)]
pub(crate) struct DatasetNode {
    pub layout: DatasetLayout,
    pub buf: ArrayBuf,
}

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Group { children: Vec<(String, NodeId)> },
    Dataset(DatasetNode),
}

/// One group or dataset with its ordered attribute list.
#[derive(Clone, Debug)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    pub attrs: Vec<(String, Value)>,
}

impl NodeData {
    pub fn group() -> Self {
        Self { kind: NodeKind::Group { children: Vec::new() }, attrs: Vec::new() }
    }

    pub fn dataset(layout: DatasetLayout, buf: ArrayBuf) -> Self {
        Self { kind: NodeKind::Dataset(DatasetNode { layout, buf }), attrs: Vec::new() }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn attr_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.attrs.iter_mut().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn remove_attr(&mut self, name: &str) -> bool {
        let before = self.attrs.len();
        self.attrs.retain(|(n, _)| n != name);
        self.attrs.len() != before
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group { .. })
    }
}

/// Arena of nodes. Node 0 is the root group.
#[derive(Clone, Debug)]
pub(crate) struct Tree {
    nodes: Vec<NodeData>,
    dirty: bool,
}

impl Tree {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self { nodes: vec![NodeData::group()], dirty: false }
    }

    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }

    /// Mutable access marks the tree as modified.
    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.dirty = true;
        &mut self.nodes[id]
    }

    pub fn children(&self, id: NodeId) -> &[(String, NodeId)] {
        match &self.nodes[id].kind {
            NodeKind::Group { children } => children,
            NodeKind::Dataset(_) => &[],
        }
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent).iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Append a child node. The caller checks for name collisions.
    pub fn add_child(&mut self, parent: NodeId, name: &str, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(data);
        if let NodeKind::Group { children } = &mut self.nodes[parent].kind {
            children.push((name.to_string(), id));
        }
        self.dirty = true;
        id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
