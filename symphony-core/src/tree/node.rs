//! The typed, recursive strategy-tree model.
//!
//! A symphony is an immutable tree of decision nodes. The compiler walks it
//! and dispatches on the variant tag; nothing here is ever mutated after
//! parse.

use crate::domain::NodeId;
use crate::indicators::IndicatorKind;
use std::fmt;

/// One node of a strategy tree.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyNode {
    /// Terminal: all incoming weight becomes an allocation to `ticker`.
    AssetLeaf { id: NodeId, ticker: String },
    /// Splits incoming weight across children per a weighting rule.
    WeightedGroup {
        id: NodeId,
        rule: WeightRule,
        children: Vec<StrategyNode>,
    },
    /// Routes the full incoming weight to exactly one side per date.
    Conditional {
        id: NodeId,
        predicate: Predicate,
        then_branch: Box<StrategyNode>,
        else_branch: Box<StrategyNode>,
    },
    /// Ranks candidates by an indicator and allocates only among the
    /// selected top/bottom `count`.
    Filter {
        id: NodeId,
        sort_key: SortKey,
        direction: SelectDirection,
        count: usize,
        children: Vec<StrategyNode>,
    },
}

impl StrategyNode {
    pub fn id(&self) -> &NodeId {
        match self {
            StrategyNode::AssetLeaf { id, .. }
            | StrategyNode::WeightedGroup { id, .. }
            | StrategyNode::Conditional { id, .. }
            | StrategyNode::Filter { id, .. } => id,
        }
    }

    /// Child nodes in document order.
    pub fn children(&self) -> Vec<&StrategyNode> {
        match self {
            StrategyNode::AssetLeaf { .. } => Vec::new(),
            StrategyNode::WeightedGroup { children, .. }
            | StrategyNode::Filter { children, .. } => children.iter().collect(),
            StrategyNode::Conditional { then_branch, else_branch, .. } => {
                vec![then_branch, else_branch]
            }
        }
    }
}

/// How a `WeightedGroup` splits its incoming weight.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightRule {
    /// 1/k per child, regardless of data availability.
    Equal,
    /// Proportional to 1/σ of each child's representative asset, where σ is
    /// the rolling standard deviation of daily returns over `window`.
    InverseVolatility { window: usize },
    /// Fixed fractions from the document, one per child, summing to 1.
    Explicit { weights: Vec<f64> },
}

/// Boolean predicate of a `Conditional`, evaluated per date.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(Comparison),
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
}

/// A single indicator comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub lhs: IndicatorExpr,
    pub op: CompareOp,
    pub rhs: Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CompareOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Gte => lhs >= rhs,
            CompareOp::Lte => lhs <= rhs,
        }
    }
}

/// Right-hand side of a comparison: another indicator or a literal threshold.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expr(IndicatorExpr),
    Literal(f64),
}

/// `(ticker, indicator-kind, window)` — a derived series reference used in
/// predicates and sort keys.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorExpr {
    pub ticker: String,
    pub kind: IndicatorKind,
    pub window: usize,
}

/// Sort key of a `Filter`: the indicator applied to each candidate's own
/// representative asset.
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub kind: IndicatorKind,
    pub window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectDirection {
    Top,
    Bottom,
}

// ─── Display ─────────────────────────────────────────────────────────

impl fmt::Display for IndicatorExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.kind, self.ticker, self.window)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Gt => ">",
            CompareOp::Lt => "<",
            CompareOp::Gte => ">=",
            CompareOp::Lte => "<=",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rhs {
            Operand::Expr(expr) => write!(f, "{} {} {}", self.lhs, self.op, expr),
            Operand::Literal(v) => write!(f, "{} {} {}", self.lhs, self.op, v),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Comparison(c) => write!(f, "{c}"),
            Predicate::AllOf(parts) => {
                let joined: Vec<String> = parts.iter().map(|p| format!("({p})")).collect();
                write!(f, "{}", joined.join(" and "))
            }
            Predicate::AnyOf(parts) => {
                let joined: Vec<String> = parts.iter().map(|p| format!("({p})")).collect();
                write!(f, "{}", joined.join(" or "))
            }
        }
    }
}
