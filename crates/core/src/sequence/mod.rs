//! Sequence-form CFR for two-player zero-sum games.
//!
//! Each player is described by a [`TreeFormDecisionProcess`]; strategies
//! are realization plans over its sequences and the game is a sparse
//! bilinear utility between the two plans.

pub mod format;
pub mod game;
pub mod minimizer;
pub mod process;

pub use format::FormatError;
pub use game::{SequenceFormSolver, TwoPlayerZeroSumGame};
pub use minimizer::SequenceFormCfr;
pub use process::{CompiledProcess, PointKind, ProcessError, ProcessNode, Transition, TreeFormDecisionProcess};
