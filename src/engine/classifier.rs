//! Decision-tree classifier - drives one diagnosis session per user through
//! the yes/no question tree until a sticking mechanism is reached.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::{Answer, DecisionTree, DiagnosticNode, Edge, MechanismResult};
use crate::error::{EngineError, EngineResult, StoreError};
use crate::sessions::{DiagnosisSession, DiagnosisStep, SessionStore};

// ============================================================================
// Parameters
// ============================================================================

/// Input parameters for starting a diagnosis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartParams {
    /// Existing session to restart; a new session is created if omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Input parameters for answering the current question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerParams {
    /// Session being driven.
    pub session_id: String,
    /// Node the client believes it is answering.
    pub node_id: String,
    /// The answer.
    pub answer: Answer,
}

/// Input parameters for reading a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionParams {
    /// Session to read.
    pub session_id: String,
}

// ============================================================================
// Result Types
// ============================================================================

/// A question presented to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Node identifier to echo back with the answer.
    pub node_id: String,
    /// Question text.
    pub question: String,
}

impl From<&DiagnosticNode> for Question {
    fn from(node: &DiagnosticNode) -> Self {
        Self {
            node_id: node.node_id.clone(),
            question: node.question.clone(),
        }
    }
}

/// Result of starting a diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResult {
    /// Session token for subsequent answers.
    pub session_id: String,
    /// Root question.
    #[serde(flatten)]
    pub question: Question,
}

/// Outcome of answering a question: the next question or the diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Another question follows.
    Question(Question),
    /// A mechanism was reached.
    Result(MechanismResult),
}

/// Snapshot of a session for clients rebuilding their view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    /// Session token.
    pub session_id: String,
    /// Steps taken so far.
    pub steps: Vec<DiagnosisStep>,
    /// Question awaiting an answer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Question>,
    /// Diagnosis, once reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MechanismResult>,
}

// ============================================================================
// Classifier
// ============================================================================

/// Stateful decision-tree traversal over a shared session store.
#[derive(Clone)]
pub struct Classifier {
    tree: Arc<DecisionTree>,
    store: Arc<dyn SessionStore>,
}

impl Classifier {
    /// Create a classifier over the given tree and session store.
    pub fn new(tree: Arc<DecisionTree>, store: Arc<dyn SessionStore>) -> Self {
        Self { tree, store }
    }

    /// The tree being traversed.
    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Start (or restart) a session and return the root question.
    pub async fn start(&self, params: StartParams) -> EngineResult<StartResult> {
        let root = self.tree.root();
        let session = match params.session_id {
            Some(id) if !id.trim().is_empty() => DiagnosisSession::with_id(id, &root.node_id),
            _ => DiagnosisSession::new(&root.node_id),
        };
        self.store.insert(&session).await?;

        info!(session_id = %session.id, "Diagnosis started");

        Ok(StartResult {
            session_id: session.id,
            question: Question::from(root),
        })
    }

    /// Answer the session's current question.
    ///
    /// Fails with [`EngineError::InvalidNode`] if `node_id` is not the node the
    /// session is waiting on, including after the diagnosis has completed. The
    /// stored session is left untouched on any failure.
    pub async fn answer(&self, params: AnswerParams) -> EngineResult<AnswerOutcome> {
        let session = self.load(&params.session_id).await?;

        let current = match session.current_node.as_deref() {
            Some(current) if current == params.node_id => current,
            expected => {
                warn!(
                    session_id = %session.id,
                    expected = ?expected,
                    received = %params.node_id,
                    "Rejected answer for stale node"
                );
                return Err(EngineError::InvalidNode {
                    expected: expected.map(str::to_string),
                    received: params.node_id,
                });
            }
        };

        let node = self
            .tree
            .node(current)
            .ok_or_else(|| EngineError::InvalidNode {
                expected: None,
                received: current.to_string(),
            })?;

        let mut next = session.clone();
        next.steps.push(DiagnosisStep {
            node_id: node.node_id.clone(),
            question: node.question.clone(),
            answer: params.answer,
        });
        next.revision = session.revision + 1;
        next.updated_at = Utc::now();

        let outcome = match node.edge(params.answer) {
            Edge::Node(child_id) => {
                let child = self
                    .tree
                    .node(child_id)
                    .ok_or_else(|| EngineError::InvalidNode {
                        expected: None,
                        received: child_id.clone(),
                    })?;
                next.current_node = Some(child.node_id.clone());
                AnswerOutcome::Question(Question::from(child))
            }
            Edge::Mechanism(mechanism) => {
                let result = MechanismResult::from(*mechanism);
                next.current_node = None;
                next.result = Some(result.clone());
                info!(
                    session_id = %session.id,
                    mechanism = %mechanism,
                    steps = next.steps.len(),
                    "Diagnosis reached"
                );
                AnswerOutcome::Result(result)
            }
        };

        self.store
            .save(&next, session.revision)
            .await
            .map_err(|e| match e {
                StoreError::Conflict { .. } => {
                    warn!(session_id = %session.id, "Concurrent answer advanced the session first");
                    EngineError::InvalidNode {
                        expected: None,
                        received: params.node_id.clone(),
                    }
                }
                StoreError::NotFound { session_id } => EngineError::SessionNotFound { session_id },
            })?;

        Ok(outcome)
    }

    /// Read the session's steps, pending question, and result.
    pub async fn session(&self, params: SessionParams) -> EngineResult<SessionView> {
        let session = self.load(&params.session_id).await?;
        let current = session
            .current_node
            .as_deref()
            .and_then(|id| self.tree.node(id))
            .map(Question::from);

        Ok(SessionView {
            session_id: session.id,
            steps: session.steps,
            current,
            result: session.result,
        })
    }

    async fn load(&self, session_id: &str) -> EngineResult<DiagnosisSession> {
        self.store
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound {
                session_id: session_id.to_string(),
            })
    }
}
