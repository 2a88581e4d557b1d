//! Diagnostic decision tree.
//!
//! The tree is stored as an arena of [`DiagnosticNode`]s keyed by node id.
//! Each node asks a yes/no question; each answer leads either to another
//! node or to a terminal [`Mechanism`]. A tree is validated once when it is
//! built or loaded:
//! - the root exists and every edge resolves
//! - no node ids are duplicated and no question is blank
//! - the graph is acyclic
//! - every node is reachable from the root
//! - no path asks more than [`MAX_DEPTH`] questions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use super::Mechanism;
use crate::error::TreeError;

/// Maximum number of questions on any root-to-terminal path.
pub const MAX_DEPTH: usize = 6;

/// A yes/no answer to a diagnostic question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    /// Affirmative.
    Yes,
    /// Negative.
    No,
}

impl Answer {
    /// Get the answer as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Answer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Ok(Answer::Yes),
            "no" | "n" => Ok(Answer::No),
            _ => Err(format!("Unknown answer: {}", s)),
        }
    }
}

/// Target of a yes/no edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    /// Continue with another question.
    Node(String),
    /// Diagnosis reached.
    Mechanism(Mechanism),
}

/// One question in the decision tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticNode {
    /// Stable node identifier.
    pub node_id: String,
    /// Question put to the engineer.
    pub question: String,
    /// Edge followed on a "yes" answer.
    pub yes: Edge,
    /// Edge followed on a "no" answer.
    pub no: Edge,
}

impl DiagnosticNode {
    /// Edge for the given answer.
    pub fn edge(&self, answer: Answer) -> &Edge {
        match answer {
            Answer::Yes => &self.yes,
            Answer::No => &self.no,
        }
    }

    fn node(node_id: &str, question: &str, yes: Edge, no: Edge) -> Self {
        Self {
            node_id: node_id.to_string(),
            question: question.to_string(),
            yes,
            no,
        }
    }
}

/// Serialized form of a tree, as read from a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDefinition {
    /// Root node id.
    pub root: String,
    /// All nodes of the tree.
    pub nodes: Vec<DiagnosticNode>,
}

/// A validated diagnostic decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: String,
    nodes: HashMap<String, DiagnosticNode>,
    depth: usize,
}

impl DecisionTree {
    /// Build and validate a tree from its definition.
    pub fn from_definition(definition: TreeDefinition) -> Result<Self, TreeError> {
        let mut nodes = HashMap::with_capacity(definition.nodes.len());
        for node in definition.nodes {
            if node.question.trim().is_empty() {
                return Err(TreeError::EmptyQuestion {
                    node_id: node.node_id,
                });
            }
            if nodes.contains_key(&node.node_id) {
                return Err(TreeError::DuplicateNode {
                    node_id: node.node_id,
                });
            }
            nodes.insert(node.node_id.clone(), node);
        }

        if !nodes.contains_key(&definition.root) {
            return Err(TreeError::MissingRoot {
                root: definition.root,
            });
        }

        for node in nodes.values() {
            for answer in [Answer::Yes, Answer::No] {
                if let Edge::Node(to) = node.edge(answer) {
                    if !nodes.contains_key(to) {
                        return Err(TreeError::DanglingEdge {
                            from: node.node_id.clone(),
                            answer: answer.to_string(),
                            to: to.clone(),
                        });
                    }
                }
            }
        }

        let mut walk = DepthWalk {
            nodes: &nodes,
            state: HashMap::new(),
        };
        let depth = walk.depth(&definition.root)?;

        // Sorted so the reported node is deterministic.
        let mut unreachable: Vec<&String> = nodes
            .keys()
            .filter(|id| !walk.state.contains_key(*id))
            .collect();
        unreachable.sort();
        if let Some(node_id) = unreachable.first() {
            return Err(TreeError::Unreachable {
                node_id: (*node_id).clone(),
            });
        }

        if depth > MAX_DEPTH {
            return Err(TreeError::TooDeep {
                depth,
                max: MAX_DEPTH,
            });
        }

        Ok(Self {
            root: definition.root,
            nodes,
            depth,
        })
    }

    /// Load and validate a tree from a JSON definition file.
    pub fn load(path: &Path) -> Result<Self, TreeError> {
        let raw = std::fs::read_to_string(path)?;
        let definition: TreeDefinition = serde_json::from_str(&raw)?;
        let tree = Self::from_definition(definition)?;
        info!(
            path = %path.display(),
            nodes = tree.node_count(),
            depth = tree.depth(),
            "Loaded diagnostic tree"
        );
        Ok(tree)
    }

    /// The built-in stuck-pipe tree covering every mechanism.
    pub fn builtin() -> Result<Self, TreeError> {
        Self::from_definition(builtin_definition())
    }

    /// Root node id.
    pub fn root_id(&self) -> &str {
        &self.root
    }

    /// Root node.
    pub fn root(&self) -> &DiagnosticNode {
        &self.nodes[&self.root]
    }

    /// Look up a node by id.
    pub fn node(&self, node_id: &str) -> Option<&DiagnosticNode> {
        self.nodes.get(node_id)
    }

    /// Number of questions in the tree.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-terminal path, counted in questions.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Every mechanism some path can reach.
    pub fn reachable_mechanisms(&self) -> BTreeSet<Mechanism> {
        self.nodes
            .values()
            .flat_map(|n| [&n.yes, &n.no])
            .filter_map(|e| match e {
                Edge::Mechanism(m) => Some(*m),
                Edge::Node(_) => None,
            })
            .collect()
    }

    /// Export the tree back to its definition form, nodes sorted by id.
    pub fn to_definition(&self) -> TreeDefinition {
        let mut nodes: Vec<DiagnosticNode> = self.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        TreeDefinition {
            root: self.root.clone(),
            nodes,
        }
    }
}

#[derive(Clone, Copy)]
enum Visit {
    InProgress,
    Done(usize),
}

/// Depth-first walk computing subtree depth and detecting cycles.
struct DepthWalk<'a> {
    nodes: &'a HashMap<String, DiagnosticNode>,
    state: HashMap<String, Visit>,
}

impl DepthWalk<'_> {
    fn depth(&mut self, node_id: &str) -> Result<usize, TreeError> {
        match self.state.get(node_id) {
            Some(Visit::Done(d)) => return Ok(*d),
            Some(Visit::InProgress) => {
                return Err(TreeError::Cycle {
                    node_id: node_id.to_string(),
                })
            }
            None => {}
        }
        self.state.insert(node_id.to_string(), Visit::InProgress);

        let nodes = self.nodes;
        let node = &nodes[node_id];
        let mut deepest = 0;
        for edge in [&node.yes, &node.no] {
            if let Edge::Node(child) = edge {
                deepest = deepest.max(self.depth(child)?);
            }
        }

        let depth = deepest + 1;
        self.state.insert(node_id.to_string(), Visit::Done(depth));
        Ok(depth)
    }
}

fn to(node_id: &str) -> Edge {
    Edge::Node(node_id.to_string())
}

fn diagnose(mechanism: Mechanism) -> Edge {
    Edge::Mechanism(mechanism)
}

/// Built-in tree definition.
///
/// The first split is on circulation: restricted circulation points at the
/// annulus (cuttings, cavings, influx, bridges), free circulation points at
/// the pipe and wall (differential, geometry, junk).
pub fn builtin_definition() -> TreeDefinition {
    use Mechanism::*;

    let nodes = vec![
        DiagnosticNode::node(
            "q_circulation",
            "Can you circulate freely at normal pump pressure with full returns?",
            to("q_stationary"),
            to("q_pressure_rise"),
        ),
        DiagnosticNode::node(
            "q_pressure_rise",
            "Did pump pressure rise or returns drop off before the string stuck?",
            to("q_cuttings_load"),
            to("q_influx"),
        ),
        DiagnosticNode::node(
            "q_cuttings_load",
            "Was a heavy cuttings load expected (high ROP, high angle, or low flow rate) with poor returns at the shakers?",
            diagnose(HoleCleaning),
            to("q_cavings"),
        ),
        DiagnosticNode::node(
            "q_cavings",
            "Are large splintery or blocky cavings coming over the shakers?",
            diagnose(WellboreInstability),
            diagnose(PackOffBridge),
        ),
        DiagnosticNode::node(
            "q_influx",
            "Are there well-control indicators such as pit gain, flow with pumps off, or gas-cut mud?",
            diagnose(FormationFlow),
            diagnose(PackOffBridge),
        ),
        DiagnosticNode::node(
            "q_stationary",
            "Was the string stationary (connection, survey, or repair) when it became stuck?",
            to("q_permeable"),
            to("q_pulling_out"),
        ),
        DiagnosticNode::node(
            "q_permeable",
            "Is a permeable formation exposed across the BHA with mud weight well above pore pressure?",
            diagnose(DifferentialSticking),
            to("q_junk"),
        ),
        DiagnosticNode::node(
            "q_pulling_out",
            "Did the string stick while moving upward (pulling out of hole or back-reaming)?",
            to("q_dogleg"),
            to("q_undergauge"),
        ),
        DiagnosticNode::node(
            "q_dogleg",
            "Is there a dogleg above the stuck point that has seen long rotating hours?",
            diagnose(KeySeating),
            to("q_junk"),
        ),
        DiagnosticNode::node(
            "q_undergauge",
            "Was the previous bit pulled under gauge, or is a stiffer BHA being run into recently drilled hole?",
            diagnose(UndergaugeHole),
            to("q_junk"),
        ),
        DiagnosticNode::node(
            "q_junk",
            "Is junk in the hole, damaged casing, or loose cement suspected above the BHA?",
            diagnose(MechanicalSticking),
            diagnose(WellboreInstability),
        ),
    ];

    TreeDefinition {
        root: "q_circulation".to_string(),
        nodes,
    }
}
