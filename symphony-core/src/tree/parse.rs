//! Parse a strategy-tree document into an immutable `StrategyNode` graph.
//!
//! The document is the JSON rendering of a symphony definition: tagged node
//! objects (`asset`, `group`, `condition`, `filter`), each optionally
//! carrying its own `id`. Nodes without a document id get a deterministic
//! path-derived one, so re-parsing the same document always yields the same
//! ids.
//!
//! Structural validation happens here, not at compile time: explicit weights
//! must sum to 1, windows must be positive for windowed indicators, children
//! must be non-empty, ids must be unique.

use crate::domain::NodeId;
use crate::indicators::IndicatorKind;
use serde::Deserialize;
use std::collections::HashSet;

use super::node::{
    CompareOp, Comparison, IndicatorExpr, Operand, Predicate, SelectDirection, SortKey,
    StrategyNode, WeightRule,
};

/// Errors raised while turning a document into a tree.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid tree document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("unknown indicator kind '{0}'")]
    UnknownIndicator(String),
    #[error("unknown comparison operator '{0}'")]
    UnknownComparison(String),
    #[error("unknown filter direction '{0}' (expected 'top' or 'bottom')")]
    UnknownDirection(String),
    #[error("indicator '{kind}' requires a positive window")]
    MissingWindow { kind: IndicatorKind },
    #[error("node '{at}' has no children")]
    EmptyChildren { at: String },
    #[error("node '{at}': {count} explicit weights for {children} children")]
    WeightCountMismatch { at: String, count: usize, children: usize },
    #[error("node '{at}': explicit weights sum to {sum}, expected 1")]
    BadExplicitWeights { at: String, sum: f64 },
    #[error("node '{at}': filter count must be at least 1")]
    ZeroFilterCount { at: String },
    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),
}

/// Parse a tree from JSON text.
pub fn parse_str(document: &str) -> Result<StrategyNode, ParseError> {
    let raw: RawNode = serde_json::from_str(document)?;
    parse_raw(raw)
}

/// Parse a tree from an already-deserialized JSON value.
pub fn parse_value(document: serde_json::Value) -> Result<StrategyNode, ParseError> {
    let raw: RawNode = serde_json::from_value(document)?;
    parse_raw(raw)
}

fn parse_raw(raw: RawNode) -> Result<StrategyNode, ParseError> {
    let mut seen = HashSet::new();
    convert(raw, "root", &mut seen)
}

// ─── Raw document shape ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum RawNode {
    Asset {
        #[serde(default)]
        id: Option<String>,
        ticker: String,
    },
    Group {
        #[serde(default)]
        id: Option<String>,
        weighting: RawWeighting,
        children: Vec<RawNode>,
    },
    Condition {
        #[serde(default)]
        id: Option<String>,
        predicate: RawPredicate,
        then: Box<RawNode>,
        #[serde(rename = "else")]
        otherwise: Box<RawNode>,
    },
    Filter {
        #[serde(default)]
        id: Option<String>,
        sort: RawSortKey,
        select: RawSelect,
        children: Vec<RawNode>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
enum RawWeighting {
    Equal,
    InverseVolatility { window: usize },
    Explicit { weights: Vec<f64> },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum RawPredicate {
    Comparison {
        lhs: RawIndicator,
        op: String,
        rhs: RawOperand,
    },
    AllOf { of: Vec<RawPredicate> },
    AnyOf { of: Vec<RawPredicate> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOperand {
    Literal(f64),
    Indicator(RawIndicator),
}

#[derive(Debug, Deserialize)]
struct RawIndicator {
    ticker: String,
    indicator: String,
    #[serde(default)]
    window: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawSortKey {
    indicator: String,
    #[serde(default)]
    window: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawSelect {
    direction: String,
    count: usize,
}

// ─── Conversion ──────────────────────────────────────────────────────

fn convert(
    raw: RawNode,
    path: &str,
    seen: &mut HashSet<NodeId>,
) -> Result<StrategyNode, ParseError> {
    match raw {
        RawNode::Asset { id, ticker } => {
            let id = claim_id(id, &format!("asset@{path}"), seen)?;
            Ok(StrategyNode::AssetLeaf { id, ticker })
        }
        RawNode::Group { id, weighting, children } => {
            let id = claim_id(id, &format!("group@{path}"), seen)?;
            if children.is_empty() {
                return Err(ParseError::EmptyChildren { at: id.to_string() });
            }
            let rule = convert_weighting(weighting, &id, children.len())?;
            let children = convert_children(children, path, seen)?;
            Ok(StrategyNode::WeightedGroup { id, rule, children })
        }
        RawNode::Condition { id, predicate, then, otherwise } => {
            let id = claim_id(id, &format!("if@{path}"), seen)?;
            let predicate = convert_predicate(predicate)?;
            let then_branch = convert(*then, &format!("{path}/0"), seen)?;
            let else_branch = convert(*otherwise, &format!("{path}/1"), seen)?;
            Ok(StrategyNode::Conditional {
                id,
                predicate,
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            })
        }
        RawNode::Filter { id, sort, select, children } => {
            let id = claim_id(id, &format!("filter@{path}"), seen)?;
            if children.is_empty() {
                return Err(ParseError::EmptyChildren { at: id.to_string() });
            }
            if select.count == 0 {
                return Err(ParseError::ZeroFilterCount { at: id.to_string() });
            }
            let kind = indicator_kind(&sort.indicator)?;
            let window = required_window(kind, sort.window)?;
            let direction = match select.direction.as_str() {
                "top" => SelectDirection::Top,
                "bottom" => SelectDirection::Bottom,
                other => return Err(ParseError::UnknownDirection(other.to_string())),
            };
            let children = convert_children(children, path, seen)?;
            Ok(StrategyNode::Filter {
                id,
                sort_key: SortKey { kind, window },
                direction,
                count: select.count,
                children,
            })
        }
    }
}

fn convert_children(
    children: Vec<RawNode>,
    path: &str,
    seen: &mut HashSet<NodeId>,
) -> Result<Vec<StrategyNode>, ParseError> {
    children
        .into_iter()
        .enumerate()
        .map(|(i, child)| convert(child, &format!("{path}/{i}"), seen))
        .collect()
}

fn claim_id(
    document_id: Option<String>,
    path: &str,
    seen: &mut HashSet<NodeId>,
) -> Result<NodeId, ParseError> {
    let id = match document_id {
        Some(raw) => NodeId::from_document(raw),
        None => NodeId::from_path(path),
    };
    if !seen.insert(id.clone()) {
        return Err(ParseError::DuplicateNodeId(id.to_string()));
    }
    Ok(id)
}

fn convert_weighting(
    raw: RawWeighting,
    at: &NodeId,
    children: usize,
) -> Result<WeightRule, ParseError> {
    match raw {
        RawWeighting::Equal => Ok(WeightRule::Equal),
        RawWeighting::InverseVolatility { window } => {
            if window == 0 {
                return Err(ParseError::MissingWindow {
                    kind: IndicatorKind::StandardDeviationReturn,
                });
            }
            Ok(WeightRule::InverseVolatility { window })
        }
        RawWeighting::Explicit { weights } => {
            if weights.len() != children {
                return Err(ParseError::WeightCountMismatch {
                    at: at.to_string(),
                    count: weights.len(),
                    children,
                });
            }
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(ParseError::BadExplicitWeights { at: at.to_string(), sum });
            }
            Ok(WeightRule::Explicit { weights })
        }
    }
}

fn convert_predicate(raw: RawPredicate) -> Result<Predicate, ParseError> {
    match raw {
        RawPredicate::Comparison { lhs, op, rhs } => {
            let op = match op.as_str() {
                "gt" => CompareOp::Gt,
                "lt" => CompareOp::Lt,
                "gte" => CompareOp::Gte,
                "lte" => CompareOp::Lte,
                other => return Err(ParseError::UnknownComparison(other.to_string())),
            };
            let rhs = match rhs {
                RawOperand::Literal(v) => Operand::Literal(v),
                RawOperand::Indicator(raw) => Operand::Expr(convert_indicator(raw)?),
            };
            Ok(Predicate::Comparison(Comparison {
                lhs: convert_indicator(lhs)?,
                op,
                rhs,
            }))
        }
        RawPredicate::AllOf { of } => Ok(Predicate::AllOf(
            of.into_iter().map(convert_predicate).collect::<Result<_, _>>()?,
        )),
        RawPredicate::AnyOf { of } => Ok(Predicate::AnyOf(
            of.into_iter().map(convert_predicate).collect::<Result<_, _>>()?,
        )),
    }
}

fn convert_indicator(raw: RawIndicator) -> Result<IndicatorExpr, ParseError> {
    let kind = indicator_kind(&raw.indicator)?;
    let window = required_window(kind, raw.window)?;
    Ok(IndicatorExpr { ticker: raw.ticker, kind, window })
}

fn indicator_kind(name: &str) -> Result<IndicatorKind, ParseError> {
    IndicatorKind::from_name(name).ok_or_else(|| ParseError::UnknownIndicator(name.to_string()))
}

fn required_window(kind: IndicatorKind, window: Option<usize>) -> Result<usize, ParseError> {
    if !kind.is_windowed() {
        return Ok(0);
    }
    match window {
        Some(w) if w > 0 => Ok(w),
        _ => Err(ParseError::MissingWindow { kind }),
    }
}
