pub mod best_response;
pub mod compiled;
pub mod convergence;
pub mod expected_payoffs;
pub mod exploitability;
pub mod profile;
pub mod solver;
pub mod tensor_ops;

pub use best_response::BestResponse;
pub use compiled::{compile, CompileStats, CompiledGame};
pub use expected_payoffs::ExpectedPayoffs;
pub use exploitability::{best_response_values, calculate_exploitability, PlayerGap};
pub use profile::{BehavioralProfile, StrategyProfile};
pub use solver::CfrSolver;
