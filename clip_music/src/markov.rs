// Weighted transition chain for rhythmic rest counts.
//
// A row-stochastic transition matrix describes a random walk over rest-count
// states: row i, column j is the probability of moving from "i rests" to
// "j rests". The matrix is compiled into a small node arena. Each node holds
// its rest count and an ordered list of links whose [lower, upper) intervals
// partition [0, 1); a link points at its target by arena index, so
// self-loops and shared targets need no reference counting.
//
// A `Chain` walks the arena: every step draws a uniform value, resolves it
// against the current node's links, moves to the chosen target and returns
// the target's rest count. Chains are built fresh for each rhythm-generation
// call (see pattern.rs) and dropped afterwards.

use crate::error::{ClipError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Allowed drift of a row sum away from 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Square table of transition probabilities between rest counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransitionMatrix {
    rows: Vec<Vec<f64>>,
}

impl TransitionMatrix {
    /// Validate and wrap a matrix. Every row must have one entry per row of
    /// the matrix, contain only finite probabilities in [0, 1], and sum to 1
    /// within `ROW_SUM_TOLERANCE`.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ClipError::InvalidMatrix {
                row: 0,
                reason: "matrix has no rows".into(),
            });
        }
        let size = rows.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(ClipError::InvalidMatrix {
                    row: i,
                    reason: format!("expected {size} columns, found {}", row.len()),
                });
            }
            if let Some(&p) = row.iter().find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0) {
                return Err(ClipError::InvalidMatrix {
                    row: i,
                    reason: format!("invalid probability {p}"),
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ClipError::InvalidMatrix {
                    row: i,
                    reason: format!("row sums to {sum}, expected 1"),
                });
            }
        }
        Ok(TransitionMatrix { rows })
    }

    /// Number of rest-count states.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// A gentle three-state walk favoring "no rest" with occasional one- or
    /// two-beat rests.
    pub fn default_rests() -> Self {
        TransitionMatrix {
            rows: vec![
                vec![0.6, 0.3, 0.1],
                vec![0.5, 0.3, 0.2],
                vec![0.7, 0.2, 0.1],
            ],
        }
    }
}

impl<'de> Deserialize<'de> for TransitionMatrix {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let rows = Vec::<Vec<f64>>::deserialize(deserializer)?;
        TransitionMatrix::new(rows).map_err(serde::de::Error::custom)
    }
}

/// An outgoing edge: target node index plus its half-open probability band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub target: usize,
    pub lower: f64,
    pub upper: f64,
}

impl Link {
    pub fn contains(&self, r: f64) -> bool {
        self.lower <= r && r < self.upper
    }
}

/// A rest-count state and its outgoing links.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub value: usize,
    pub links: Vec<Link>,
}

impl Node {
    /// Index of the single link whose interval contains `r`, if any.
    pub fn resolve(&self, r: f64) -> Option<usize> {
        self.links.iter().position(|link| link.contains(r))
    }
}

/// Build the node arena for a matrix: node i has value i and one link per
/// column, in column order, with cumulative bounds. The last link carrying
/// probability is closed off at exactly 1.0 so rounding in the row sum
/// cannot leave a gap at the top of [0, 1).
pub fn build_nodes(matrix: &TransitionMatrix) -> Vec<Node> {
    matrix
        .rows()
        .iter()
        .enumerate()
        .map(|(value, row)| {
            let mut cumulative = 0.0;
            let mut links: Vec<Link> = row
                .iter()
                .enumerate()
                .map(|(target, &p)| {
                    let lower = cumulative;
                    cumulative += p;
                    Link {
                        target,
                        lower,
                        upper: cumulative,
                    }
                })
                .collect();
            if let Some(last) = links.iter_mut().rev().find(|l| l.upper > l.lower) {
                last.upper = 1.0;
            }
            Node { value, links }
        })
        .collect()
}

/// A random walk over a compiled transition matrix.
#[derive(Debug, Clone)]
pub struct Chain {
    nodes: Vec<Node>,
    current: usize,
}

impl Chain {
    /// Compile `matrix` and start the walk at the node for `start` rests.
    pub fn new(matrix: &TransitionMatrix, start: usize) -> Result<Self> {
        if start >= matrix.size() {
            return Err(ClipError::InvalidMatrix {
                row: start,
                reason: format!("start state {start} outside a {}-state matrix", matrix.size()),
            });
        }
        Ok(Chain {
            nodes: build_nodes(matrix),
            current: start,
        })
    }

    /// Start at the zero-rest-count node.
    pub fn from_rest_state(matrix: &TransitionMatrix) -> Result<Self> {
        Chain::new(matrix, 0)
    }

    /// Rest count of the current node.
    pub fn current(&self) -> usize {
        self.nodes[self.current].value
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Take one step and return the new node's rest count.
    pub fn next(&mut self, rng: &mut impl Rng) -> Result<usize> {
        let draw: f64 = rng.random();
        self.step_with(draw)
    }

    /// Take one step using an explicit draw in [0, 1).
    pub fn step_with(&mut self, draw: f64) -> Result<usize> {
        let node = &self.nodes[self.current];
        let link = node.resolve(draw).ok_or(ClipError::NoTransition {
            node: self.current,
            draw,
        })?;
        let target = node.links[link].target;
        debug!(from = self.current, to = target, draw, "chain step");
        self.current = target;
        Ok(self.nodes[target].value)
    }
}
