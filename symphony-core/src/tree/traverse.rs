//! Traversal utilities over a strategy tree.
//!
//! Collectors used by the compiler and its callers: which tickers a tree
//! touches at all, which it can actually hold, which conditions guard each
//! leaf, and id-based lookup for post-hoc investigation of flagged branches.

use crate::domain::NodeId;
use std::collections::{BTreeMap, BTreeSet};

use super::node::{Operand, Predicate, SelectDirection, StrategyNode};

/// Every ticker the tree references: allocatable leaves plus tickers that
/// only feed indicator expressions (conditions and sort keys need their
/// price history too).
pub fn collect_referenced_assets(root: &StrategyNode) -> BTreeSet<String> {
    let mut tickers = BTreeSet::new();
    visit(root, &mut |node| match node {
        StrategyNode::AssetLeaf { ticker, .. } => {
            tickers.insert(ticker.clone());
        }
        StrategyNode::Conditional { predicate, .. } => {
            collect_predicate_tickers(predicate, &mut tickers);
        }
        _ => {}
    });
    tickers
}

/// Tickers the tree can actually hold — the allocation matrix's columns.
pub fn collect_allocatable_assets(root: &StrategyNode) -> BTreeSet<String> {
    let mut tickers = BTreeSet::new();
    visit(root, &mut |node| {
        if let StrategyNode::AssetLeaf { ticker, .. } = node {
            tickers.insert(ticker.clone());
        }
    });
    tickers
}

/// Ids of the asset leaves — the branch-tracker columns that attribution
/// reads when an allocation row fails to sum to 1.
pub fn collect_leaf_ids(root: &StrategyNode) -> BTreeSet<NodeId> {
    let mut ids = BTreeSet::new();
    visit(root, &mut |node| {
        if let StrategyNode::AssetLeaf { id, .. } = node {
            ids.insert(id.clone());
        }
    });
    ids
}

/// For every leaf, the chain of conditions that must hold for it to receive
/// weight, rendered human-readably in root-to-leaf order.
pub fn collect_branch_conditions(root: &StrategyNode) -> BTreeMap<NodeId, Vec<String>> {
    let mut out = BTreeMap::new();
    let mut guards = Vec::new();
    collect_guards(root, &mut guards, &mut out);
    out
}

fn collect_guards(
    node: &StrategyNode,
    guards: &mut Vec<String>,
    out: &mut BTreeMap<NodeId, Vec<String>>,
) {
    match node {
        StrategyNode::AssetLeaf { id, .. } => {
            out.insert(id.clone(), guards.clone());
        }
        StrategyNode::WeightedGroup { children, .. } => {
            for child in children {
                collect_guards(child, guards, out);
            }
        }
        StrategyNode::Conditional { predicate, then_branch, else_branch, .. } => {
            guards.push(predicate.to_string());
            collect_guards(then_branch, guards, out);
            guards.pop();

            guards.push(format!("not ({predicate})"));
            collect_guards(else_branch, guards, out);
            guards.pop();
        }
        StrategyNode::Filter { sort_key, direction, count, children, .. } => {
            let dir = match direction {
                SelectDirection::Top => "top",
                SelectDirection::Bottom => "bottom",
            };
            guards.push(format!("selected {dir} {count} by {}({})", sort_key.kind, sort_key.window));
            for child in children {
                collect_guards(child, guards, out);
            }
            guards.pop();
        }
    }
}

/// Locate a node anywhere in the tree by its id.
pub fn find_node_by_id<'a>(root: &'a StrategyNode, id: &NodeId) -> Option<&'a StrategyNode> {
    if root.id() == id {
        return Some(root);
    }
    root.children().into_iter().find_map(|c| find_node_by_id(c, id))
}

/// First allocatable leaf in preorder — the asset that stands in for a whole
/// subtree when a weighting rule or filter needs one series per child.
pub fn representative_asset(node: &StrategyNode) -> Option<&str> {
    match node {
        StrategyNode::AssetLeaf { ticker, .. } => Some(ticker),
        _ => node.children().into_iter().find_map(representative_asset),
    }
}

fn visit(node: &StrategyNode, f: &mut impl FnMut(&StrategyNode)) {
    f(node);
    for child in node.children() {
        visit(child, f);
    }
}

fn collect_predicate_tickers(predicate: &Predicate, tickers: &mut BTreeSet<String>) {
    match predicate {
        Predicate::Comparison(c) => {
            tickers.insert(c.lhs.ticker.clone());
            if let Operand::Expr(expr) = &c.rhs {
                tickers.insert(expr.ticker.clone());
            }
        }
        Predicate::AllOf(parts) | Predicate::AnyOf(parts) => {
            for p in parts {
                collect_predicate_tickers(p, tickers);
            }
        }
    }
}
