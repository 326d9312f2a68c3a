//! Finite rooted trees.
//!
//! A [`Tree`] is built from a vertex set, a root, a leaf set and a parent
//! map. Construction validates the structure once; afterwards every vertex
//! is addressed by a dense index (its position in the vertex list) and all
//! derived views (children, non-roots, internal vertices, breadth-first
//! levels) are cached.

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Bound shared by every opaque identifier (vertices, information sets,
/// actions, players).
pub trait Label: Clone + Eq + Hash + Debug {}

impl<T: Clone + Eq + Hash + Debug> Label for T {}

/// Structural validation failures raised by [`Tree::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("root {0} is not a member of the vertices")]
    RootNotVertex(String),

    #[error("leaf {0} is not a member of the vertices")]
    LeafNotVertex(String),

    #[error("parent defined for unknown vertex {0}")]
    UnknownChild(String),

    #[error("parent defined for the root {0}")]
    ParentOfRoot(String),

    #[error("vertex {child} has unknown parent {parent}")]
    UnknownParent { child: String, parent: String },

    #[error("parent of {0} defined more than once")]
    DuplicateParent(String),

    #[error("parent not defined for non-root {0}")]
    MissingParent(String),

    #[error("leaf {0} has children")]
    LeafHasChildren(String),

    #[error("internal vertex {0} has no children")]
    ChildlessInternalVertex(String),

    #[error("vertex {0} is not reachable from the root")]
    Unreachable(String),
}

fn render<V: Debug>(vertex: &V) -> String {
    format!("{vertex:?}")
}

/// An immutable, validated finite rooted tree.
#[derive(Debug, Clone)]
pub struct Tree<V> {
    vertices: Vec<V>,
    index: FxHashMap<V, usize>,
    root: usize,
    leaves: Vec<usize>,
    is_leaf: Vec<bool>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    non_roots: Vec<usize>,
    internal_vertices: Vec<usize>,
    levels: Vec<Vec<usize>>,
    depths: Vec<usize>,
}

impl<V: Label> Tree<V> {
    /// Build and validate a tree.
    ///
    /// Vertex and leaf lists have set semantics: repeated entries collapse
    /// and the first occurrence fixes the vertex index. `parents` maps each
    /// child to its parent and must cover every non-root vertex exactly once.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] naming the first vertex that breaks one of:
    /// root and leaves are vertices, the parent map is defined exactly on the
    /// non-roots with known parents, leaves have no children, every internal
    /// vertex has a child, and every vertex is reachable from the root.
    pub fn new(
        vertices: impl IntoIterator<Item = V>,
        root: V,
        leaves: impl IntoIterator<Item = V>,
        parents: impl IntoIterator<Item = (V, V)>,
    ) -> Result<Self, TreeError> {
        let mut ordered = Vec::new();
        let mut index = FxHashMap::default();
        for vertex in vertices {
            if !index.contains_key(&vertex) {
                index.insert(vertex.clone(), ordered.len());
                ordered.push(vertex);
            }
        }
        let n = ordered.len();

        let root_idx = *index
            .get(&root)
            .ok_or_else(|| TreeError::RootNotVertex(render(&root)))?;

        let mut is_leaf = vec![false; n];
        let mut leaf_list = Vec::new();
        for leaf in leaves {
            let idx = *index
                .get(&leaf)
                .ok_or_else(|| TreeError::LeafNotVertex(render(&leaf)))?;
            if !is_leaf[idx] {
                is_leaf[idx] = true;
                leaf_list.push(idx);
            }
        }

        let mut parent_of = vec![None; n];
        for (child, parent) in parents {
            let c = *index
                .get(&child)
                .ok_or_else(|| TreeError::UnknownChild(render(&child)))?;
            if c == root_idx {
                return Err(TreeError::ParentOfRoot(render(&child)));
            }
            let p = *index.get(&parent).ok_or_else(|| TreeError::UnknownParent {
                child: render(&child),
                parent: render(&parent),
            })?;
            if parent_of[c].replace(p).is_some() {
                return Err(TreeError::DuplicateParent(render(&child)));
            }
        }

        let mut children = vec![Vec::new(); n];
        let mut non_roots = Vec::with_capacity(n.saturating_sub(1));
        for v in 0..n {
            if v == root_idx {
                continue;
            }
            let p = parent_of[v].ok_or_else(|| TreeError::MissingParent(render(&ordered[v])))?;
            children[p].push(v);
            non_roots.push(v);
        }

        let mut internal_vertices = Vec::new();
        for v in 0..n {
            match (is_leaf[v], children[v].is_empty()) {
                (true, false) => return Err(TreeError::LeafHasChildren(render(&ordered[v]))),
                (false, true) => {
                    return Err(TreeError::ChildlessInternalVertex(render(&ordered[v])));
                }
                (false, false) => internal_vertices.push(v),
                (true, true) => {}
            }
        }

        // Breadth-first layering from the root; anything left unvisited sits
        // on a parent cycle detached from the root.
        let mut depths = vec![usize::MAX; n];
        let mut levels = Vec::new();
        let mut frontier = vec![root_idx];
        depths[root_idx] = 0;
        while !frontier.is_empty() {
            let depth = levels.len();
            let mut next = Vec::new();
            for &v in &frontier {
                for &c in &children[v] {
                    depths[c] = depth + 1;
                    next.push(c);
                }
            }
            levels.push(frontier);
            frontier = next;
        }
        if let Some(v) = depths.iter().position(|&d| d == usize::MAX) {
            return Err(TreeError::Unreachable(render(&ordered[v])));
        }

        Ok(Self {
            vertices: ordered,
            index,
            root: root_idx,
            leaves: leaf_list,
            is_leaf,
            parents: parent_of,
            children,
            non_roots,
            internal_vertices,
            levels,
            depths,
        })
    }

    /// Dense index of a vertex label.
    #[must_use]
    pub fn index_of(&self, vertex: &V) -> Option<usize> {
        self.index.get(vertex).copied()
    }

    #[must_use]
    pub fn contains(&self, vertex: &V) -> bool {
        self.index.contains_key(vertex)
    }
}

impl<V> Tree<V> {
    /// Number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// A validated tree always has its root, so this is never true.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[must_use]
    pub fn vertices(&self) -> &[V] {
        &self.vertices
    }

    /// Label of the vertex at `index`.
    #[must_use]
    pub fn vertex(&self, index: usize) -> &V {
        &self.vertices[index]
    }

    #[must_use]
    pub fn root(&self) -> usize {
        self.root
    }

    /// Leaves in declaration order.
    #[must_use]
    pub fn leaves(&self) -> &[usize] {
        &self.leaves
    }

    #[must_use]
    pub fn is_leaf(&self, vertex: usize) -> bool {
        self.is_leaf[vertex]
    }

    /// Parent of `vertex`, `None` for the root.
    #[must_use]
    pub fn parent(&self, vertex: usize) -> Option<usize> {
        self.parents[vertex]
    }

    /// Children of `vertex` in vertex order.
    #[must_use]
    pub fn children(&self, vertex: usize) -> &[usize] {
        &self.children[vertex]
    }

    #[must_use]
    pub fn non_roots(&self) -> &[usize] {
        &self.non_roots
    }

    /// Vertices with at least one child, in vertex order.
    #[must_use]
    pub fn internal_vertices(&self) -> &[usize] {
        &self.internal_vertices
    }

    /// Breadth-first layers; `levels()[0]` holds only the root.
    #[must_use]
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Distance from the root.
    #[must_use]
    pub fn depth(&self, vertex: usize) -> usize {
        self.depths[vertex]
    }

    /// Number of edges on the longest root-to-leaf path.
    #[must_use]
    pub fn height(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }
}
