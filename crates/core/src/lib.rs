#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Vectorized counterfactual regret minimization for finite extensive-form
//! games.
//!
//! # Modules
//!
//! - `tree` - rooted trees over arbitrary vertex labels
//! - `game` - validated extensive-form games
//! - `backend` - numeric backends over `burn` (ndarray, WGPU behind `gpu`)
//! - `cfr` - game compilation, the CFR / CFR+ solver, best response,
//!   expected payoffs and exploitability
//! - `sequence` - sequence-form CFR for two-player zero-sum games
//! - `config` - solver configuration
//! - `error` - usage errors

pub mod backend;
pub mod cfr;
pub mod config;
pub mod error;
pub mod game;
pub mod progress;
pub mod sequence;
pub mod tree;

pub use backend::{Backend, CpuBackend, NdArrayBackend};
pub use cfr::{calculate_exploitability, BehavioralProfile, BestResponse, CfrSolver, ExpectedPayoffs, StrategyProfile};
pub use config::{CfrConfig, CfrVariant, ConfigError, SequenceFormConfig};
pub use error::SolverError;
pub use game::{ExtensiveFormGame, GameDefinition, GameError};
pub use sequence::{SequenceFormSolver, TwoPlayerZeroSumGame};
pub use tree::{Tree, TreeError};
