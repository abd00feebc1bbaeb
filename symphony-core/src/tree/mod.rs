//! The strategy-tree model: node variants, document parsing, and traversal.

pub mod node;
pub mod parse;
pub mod traverse;

pub use node::{
    CompareOp, Comparison, IndicatorExpr, Operand, Predicate, SelectDirection, SortKey,
    StrategyNode, WeightRule,
};
pub use parse::{parse_str, parse_value, ParseError};
pub use traverse::{
    collect_allocatable_assets, collect_branch_conditions, collect_leaf_ids,
    collect_referenced_assets, find_node_by_id, representative_asset,
};
