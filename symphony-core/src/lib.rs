//! Symphony Core — strategy-tree compiler and branch-tracking backtest engine.
//!
//! This crate contains the heart of the symphony backtester:
//! - Tree model: typed recursive `StrategyNode` graph with stable node ids
//! - Indicator engine: vectorized technical indicators, memoized per compile
//! - Branch-tracking compiler: recursive interpreter producing an allocation
//!   matrix and a branch-activation matrix for a whole date range at once
//! - Alignment & validation: trims to the first fully-supported date and
//!   attributes inconsistent allocation days to branch ids
//!
//! The core is purely in-memory: trees and price histories are supplied by
//! external collaborators, and the outputs are plain date-indexed matrices.
//! Compiling one tree touches no shared state beyond its own indicator
//! cache, so independent trees can be compiled on independent threads.

pub mod align;
pub mod compiler;
pub mod domain;
pub mod indicators;
pub mod tree;

pub use align::{align_and_check, Aligned, AlignError, FailedAllocation, ALLOCATION_TOLERANCE};
pub use compiler::{compile, compile_with_cache, Compiled, CompileError, IndicatorCache};
pub use domain::{NodeId, PriceTable, TimeMatrix};
pub use indicators::{IndicatorError, IndicatorKind};
pub use tree::{parse_str, parse_value, ParseError, StrategyNode};
