//! Tree-form sequential decision processes (TFSDPs).
//!
//! A TFSDP is one player's view of a game: decision points (the player
//! picks an action), observation points (the player receives a signal) and
//! the end of the process. Sequences are (decision point, action) pairs;
//! sequence 0 is the empty sequence. Vectors over sequences without the
//! empty one (behavioral strategies, regrets) index sequence `s` at `s - 1`.

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::backend::Backend;

/// Kind of a point of a decision process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Decision,
    Observation,
}

/// Target of a transition record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessNode {
    Decision(String),
    Observation(String),
    End,
}

/// One record of a decision process: the edge `(point, action or signal)`
/// leading into `node`, or no edge for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub parent: Option<(String, String)>,
    pub node: ProcessNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("decision process has no transitions")]
    Empty,

    #[error("root transition into {0} must not have a parent edge")]
    RootHasParent(String),

    #[error("root must be a decision or observation point")]
    RootIsEnd,

    #[error("transition into {0} has no parent edge")]
    MissingParentEdge(String),

    #[error("duplicate point: {0}")]
    DuplicatePoint(String),

    #[error("parent point {0} is not declared before its children")]
    UnknownParent(String),

    #[error("event {event} appears twice at point {point}")]
    DuplicateEvent { point: String, event: String },

    #[error("point {0} has no actions or signals")]
    ChildlessPoint(String),
}

/// A validated decision process.
#[derive(Debug, Clone)]
pub struct TreeFormDecisionProcess {
    points: Vec<String>,
    point_index: FxHashMap<String, usize>,
    kinds: Vec<PointKind>,
    /// Actions (decision points) or signals (observation points).
    events: Vec<Vec<String>>,
    /// Next point per event, `None` for the end of the process.
    transitions: Vec<Vec<Option<usize>>>,
    /// Sequence per event at decision points; empty at observation points.
    event_sequences: Vec<Vec<usize>>,
    /// `(point, event position)` of every sequence but the empty one.
    sequences: Vec<(usize, usize)>,
    parent_sequences: Vec<usize>,
    decision_points: Vec<usize>,
    levels: Vec<Vec<usize>>,
}

impl TreeFormDecisionProcess {
    /// Build a process from its records, root first. Every parent point must
    /// be declared by an earlier record.
    ///
    /// Sequences are numbered in record order starting at 1.
    ///
    /// # Errors
    ///
    /// Returns the [`ProcessError`] of the first malformed record.
    pub fn new(transitions: impl IntoIterator<Item = Transition>) -> Result<Self, ProcessError> {
        let mut process = Self {
            points: Vec::new(),
            point_index: FxHashMap::default(),
            kinds: Vec::new(),
            events: Vec::new(),
            transitions: Vec::new(),
            event_sequences: Vec::new(),
            sequences: Vec::new(),
            parent_sequences: Vec::new(),
            decision_points: Vec::new(),
            levels: Vec::new(),
        };

        for (i, Transition { parent, node }) in transitions.into_iter().enumerate() {
            let label = match &node {
                ProcessNode::Decision(id) | ProcessNode::Observation(id) => id.clone(),
                ProcessNode::End => "END".to_string(),
            };
            match (i, &parent) {
                (0, Some(_)) => return Err(ProcessError::RootHasParent(label)),
                (0, None) if node == ProcessNode::End => return Err(ProcessError::RootIsEnd),
                (_, None) if i > 0 => return Err(ProcessError::MissingParentEdge(label)),
                _ => {}
            }

            let child = match node {
                ProcessNode::Decision(id) => Some(process.add_point(id, PointKind::Decision)?),
                ProcessNode::Observation(id) => Some(process.add_point(id, PointKind::Observation)?),
                ProcessNode::End => None,
            };

            if let Some((point, event)) = parent {
                let p = *process
                    .point_index
                    .get(&point)
                    .ok_or_else(|| ProcessError::UnknownParent(point.clone()))?;
                if process.events[p].contains(&event) {
                    return Err(ProcessError::DuplicateEvent { point, event });
                }
                if process.kinds[p] == PointKind::Decision {
                    process.sequences.push((p, process.events[p].len()));
                    process.event_sequences[p].push(process.sequences.len());
                }
                process.events[p].push(event);
                process.transitions[p].push(child);
            }
        }

        if process.points.is_empty() {
            return Err(ProcessError::Empty);
        }
        if let Some(p) = process.events.iter().position(Vec::is_empty) {
            return Err(ProcessError::ChildlessPoint(process.points[p].clone()));
        }
        process.index_levels();

        log::debug!(
            "decision process: {} points ({} decision), {} sequences, depth {}",
            process.points.len(),
            process.decision_points.len(),
            process.num_sequences(),
            process.levels.len()
        );
        Ok(process)
    }

    fn add_point(&mut self, id: String, kind: PointKind) -> Result<usize, ProcessError> {
        if self.point_index.contains_key(&id) {
            return Err(ProcessError::DuplicatePoint(id));
        }
        let p = self.points.len();
        if kind == PointKind::Decision {
            self.decision_points.push(p);
        }
        self.point_index.insert(id.clone(), p);
        self.points.push(id);
        self.kinds.push(kind);
        self.events.push(Vec::new());
        self.transitions.push(Vec::new());
        self.event_sequences.push(Vec::new());
        Ok(p)
    }

    /// Breadth-first levels from the root and the parent sequence of every
    /// point.
    fn index_levels(&mut self) {
        self.parent_sequences = vec![0; self.points.len()];
        let mut frontier = vec![0];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &p in &frontier {
                for (k, child) in self.transitions[p].iter().enumerate() {
                    let Some(c) = *child else {
                        continue;
                    };
                    self.parent_sequences[c] = match self.kinds[p] {
                        PointKind::Decision => self.event_sequences[p][k],
                        PointKind::Observation => self.parent_sequences[p],
                    };
                    next.push(c);
                }
            }
            self.levels.push(frontier);
            frontier = next;
        }
    }

    #[must_use]
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Number of sequences, the empty one included.
    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.sequences.len() + 1
    }

    #[must_use]
    pub fn point(&self, point: usize) -> &str {
        &self.points[point]
    }

    #[must_use]
    pub fn point_index(&self, id: &str) -> Option<usize> {
        self.point_index.get(id).copied()
    }

    #[must_use]
    pub fn kind(&self, point: usize) -> PointKind {
        self.kinds[point]
    }

    /// Actions or signals of `point`, in record order.
    #[must_use]
    pub fn events(&self, point: usize) -> &[String] {
        &self.events[point]
    }

    /// Point reached by the `k`-th event of `point`; `None` at the end of
    /// the process.
    #[must_use]
    pub fn transition(&self, point: usize, k: usize) -> Option<usize> {
        self.transitions[point][k]
    }

    /// `(point, event position)` of a non-empty sequence.
    #[must_use]
    pub fn sequence(&self, sequence: usize) -> Option<(usize, usize)> {
        sequence.checked_sub(1).and_then(|s| self.sequences.get(s).copied())
    }

    /// Sequence of taking `action` at decision point `point`.
    #[must_use]
    pub fn sequence_index(&self, point: &str, action: &str) -> Option<usize> {
        let p = self.point_index(point)?;
        let k = self.events[p].iter().position(|e| e == action)?;
        self.event_sequences[p].get(k).copied()
    }

    /// Sequences of a decision point, aligned with its actions.
    #[must_use]
    pub fn point_sequences(&self, point: usize) -> &[usize] {
        &self.event_sequences[point]
    }

    /// Last sequence on the path to `point` (0 for the root).
    #[must_use]
    pub fn parent_sequence(&self, point: usize) -> usize {
        self.parent_sequences[point]
    }

    #[must_use]
    pub fn decision_points(&self) -> &[usize] {
        &self.decision_points
    }

    /// Points by breadth-first depth, root first.
    #[must_use]
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Uniform behavioral strategy over non-empty sequences.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn behavioral_uniform_strategy(&self) -> Vec<f64> {
        self.sequences
            .iter()
            .map(|&(p, _)| 1.0 / self.events[p].len() as f64)
            .collect()
    }

    /// Realization plan of a behavioral strategy: each sequence weighted by
    /// the product of the behavioral probabilities along its path.
    ///
    /// # Panics
    ///
    /// Panics if `behavioral` does not hold one entry per non-empty sequence.
    #[must_use]
    pub fn behavioral_to_sequence_form(&self, behavioral: &[f64]) -> Vec<f64> {
        assert_eq!(behavioral.len(), self.sequences.len(), "behavioral strategy length");
        let mut plan = vec![0.0; self.num_sequences()];
        plan[0] = 1.0;
        for level in &self.levels {
            for &p in level {
                let parent = plan[self.parent_sequences[p]];
                for &s in &self.event_sequences[p] {
                    plan[s] = parent * behavioral[s - 1];
                }
            }
        }
        plan
    }

    /// Best response to a utility vector over sequences (empty sequence
    /// included): its value and pure realization plan. Ties go to the first
    /// action in record order.
    ///
    /// # Panics
    ///
    /// Panics if `utility` does not hold one entry per sequence.
    #[must_use]
    pub fn best_response(&self, utility: &[f64]) -> (f64, Vec<f64>) {
        assert_eq!(utility.len(), self.num_sequences(), "utility length");
        let mut values = vec![0.0; self.points.len()];
        let mut choices = vec![0; self.points.len()];
        for level in self.levels.iter().rev() {
            for &p in level {
                let continuation = |k: usize| self.transitions[p][k].map_or(0.0, |c| values[c]);
                let value = match self.kinds[p] {
                    PointKind::Decision => {
                        let mut best = (0, f64::NEG_INFINITY);
                        for (k, &s) in self.event_sequences[p].iter().enumerate() {
                            let value = utility[s] + continuation(k);
                            if value > best.1 {
                                best = (k, value);
                            }
                        }
                        choices[p] = best.0;
                        best.1
                    }
                    PointKind::Observation => (0..self.events[p].len()).map(continuation).sum(),
                };
                values[p] = value;
            }
        }

        let mut plan = vec![0.0; self.num_sequences()];
        plan[0] = 1.0;
        for level in &self.levels {
            for &p in level {
                let parent = plan[self.parent_sequences[p]];
                if let Some(&s) = self.event_sequences[p].get(choices[p]) {
                    plan[s] = parent;
                }
            }
        }
        (values[0] + utility[0], plan)
    }
}

/// Sparse operators of a decision process on a backend.
///
/// With `S` sequences (empty included), `K = S - 1` and `P` points:
/// - `lift` (S x K) maps a behavioral vector into sequence space;
/// - `sequence_levels[l]` (S x S) maps the parent sequence of every
///   decision point at depth `l` onto that point's sequences;
/// - `point_levels[l]` (P x P) and `edge_levels[l]` (P x K) hold the edges
///   leaving depth `l` into points and the sequences taken there;
/// - `mask` (D x K) groups sequences by decision point.
#[derive(Debug, Clone)]
pub struct CompiledProcess<B: Backend> {
    num_points: usize,
    num_sequences: usize,
    lift: B::Sparse,
    empty_sequence: B::Dense,
    sequence_levels: Vec<B::Sparse>,
    point_levels: Vec<B::Sparse>,
    edge_levels: Vec<B::Sparse>,
    /// P x K, the decision edge leading into each point.
    incoming_sequences: B::Sparse,
    /// P x 1, one for points entered through an observation edge.
    incoming_observations: B::Dense,
    /// K x S, drops the empty sequence.
    drop_empty: B::Sparse,
    /// K x P, the point each sequence leads to.
    sequence_targets: B::Sparse,
    pub mask: B::Sparse,
    pub mask_t: B::Sparse,
    pub uniform_strategy: B::Dense,
}

impl<B: Backend> CompiledProcess<B> {
    #[must_use]
    pub fn new(process: &TreeFormDecisionProcess, backend: &B) -> Self {
        let (p_count, s_count) = (process.num_points(), process.num_sequences());
        let k_count = s_count - 1;

        let lift: Vec<_> = (0..k_count).map(|k| (k + 1, k, 1.0)).collect();
        let drop_empty: Vec<_> = (0..k_count).map(|k| (k, k + 1, 1.0)).collect();

        let mut sequence_levels = Vec::new();
        let mut point_levels = Vec::new();
        let mut edge_levels = Vec::new();
        let mut incoming_sequences = Vec::new();
        let mut incoming_observations = vec![0.0; p_count];
        let mut sequence_targets = Vec::new();
        for level in process.levels() {
            let mut parents = Vec::new();
            let mut points = Vec::new();
            let mut edges = Vec::new();
            for &p in level {
                let sequences = process.point_sequences(p);
                for k in 0..process.events(p).len() {
                    let target = process.transition(p, k);
                    if let Some(&s) = sequences.get(k) {
                        parents.push((s, process.parent_sequence(p), 1.0));
                        edges.push((p, s - 1, 1.0));
                        if let Some(c) = target {
                            incoming_sequences.push((c, s - 1, 1.0));
                            sequence_targets.push((s - 1, c, 1.0));
                        }
                    } else if let Some(c) = target {
                        incoming_observations[c] = 1.0;
                    }
                    if let Some(c) = target {
                        points.push((p, c, 1.0));
                    }
                }
            }
            if !parents.is_empty() {
                sequence_levels.push(backend.sparse(s_count, s_count, &parents));
            }
            point_levels.push(backend.sparse(p_count, p_count, &points));
            edge_levels.push(backend.sparse(p_count, k_count, &edges));
        }

        let mask_triplets: Vec<_> = process
            .decision_points()
            .iter()
            .enumerate()
            .flat_map(|(row, &p)| process.point_sequences(p).iter().map(move |&s| (row, s - 1, 1.0)))
            .collect();
        let mask = backend.sparse(process.decision_points().len(), k_count, &mask_triplets);

        let mut empty_sequence = vec![0.0; s_count];
        empty_sequence[0] = 1.0;

        Self {
            num_points: p_count,
            num_sequences: s_count,
            lift: backend.sparse(s_count, k_count, &lift),
            empty_sequence: backend.column(&empty_sequence),
            sequence_levels,
            point_levels,
            edge_levels,
            incoming_sequences: backend.sparse(p_count, k_count, &incoming_sequences),
            incoming_observations: backend.column(&incoming_observations),
            drop_empty: backend.sparse(k_count, s_count, &drop_empty),
            sequence_targets: backend.sparse(k_count, p_count, &sequence_targets),
            mask_t: backend.transpose(&mask),
            mask,
            uniform_strategy: backend.column(&process.behavioral_uniform_strategy()),
        }
    }

    /// Number of sequences, the empty one included.
    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.num_sequences
    }

    /// Realization plan (S x 1) of a behavioral strategy (K x 1).
    pub fn behavioral_to_sequence_form(&self, backend: &B, behavioral: &B::Dense) -> B::Dense {
        let full = backend.add(backend.matmul(&self.lift, behavioral), &self.empty_sequence);
        let mut plan = self.empty_sequence.clone();
        for level in &self.sequence_levels {
            let step = backend.mul(backend.matmul(level, &plan), &full);
            plan = backend.add(plan, &step);
        }
        plan
    }

    /// Counterfactual utility (K x 1) of every sequence: its own utility plus
    /// the expected utility of the subtree it leads into under `behavioral`.
    pub fn counterfactual_utilities(&self, backend: &B, behavioral: &B::Dense, utility: &B::Dense) -> B::Dense {
        let sequence_utility = backend.matmul(&self.drop_empty, utility);
        let point_weights = backend.add(
            backend.matmul(&self.incoming_sequences, behavioral),
            &self.incoming_observations,
        );
        let mut values = backend.zeros(self.num_points, 1);
        for (points, edges) in self.point_levels.iter().zip(&self.edge_levels).rev() {
            let below = backend.matmul(&backend.scale_columns(points, &point_weights), &values);
            let here = backend.matmul(&backend.scale_columns(edges, behavioral), &sequence_utility);
            values = backend.add(values, &backend.add(below, &here));
        }
        backend.add(sequence_utility, &backend.matmul(&self.sequence_targets, &values))
    }
}
