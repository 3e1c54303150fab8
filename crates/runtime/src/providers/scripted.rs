//! A provider that replays canned decisions, for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ModelRequest, Provider};
use crate::model::{Decision, ModelError, ToolCall, Turn};

enum Step {
    Decide(Decision),
    Fail(ModelError),
}

/// Replays a script of decisions in order.
///
/// Once the script runs out it keeps repeating the `repeating` decision if
/// one was set, and otherwise fails with `InvalidResponse`. Every request it
/// receives is recorded.
pub struct ScriptedProvider {
    id: String,
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Decision>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers every request with the same decision.
    ///
    /// Call ids are regenerated on every answer so they stay unique.
    pub fn repeating(id: impl Into<String>, decision: Decision) -> Self {
        Self {
            repeat: Some(decision),
            ..Self::new(id)
        }
    }

    /// Queue a decision.
    pub fn then(self, decision: Decision) -> Self {
        self.push(Step::Decide(decision));
        self
    }

    /// Queue a failure.
    pub fn then_fail(self, error: ModelError) -> Self {
        self.push(Step::Fail(error));
        self
    }

    fn push(&self, step: Step) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(step);
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// The transcript of every request received, in order.
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

fn with_fresh_ids(decision: &Decision) -> Decision {
    match decision {
        Decision::Final(text) => Decision::Final(text.clone()),
        Decision::Invoke { text, calls } => Decision::Invoke {
            text: text.clone(),
            calls: calls
                .iter()
                .map(|call| {
                    ToolCall::new(ToolCall::fresh_id(), call.name.clone(), call.arguments.clone())
                })
                .collect(),
        },
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn decide(&self, request: ModelRequest<'_>) -> Result<Decision, ModelError> {
        self.seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.transcript.render().to_vec());

        let next = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();

        match (next, &self.repeat) {
            (Some(Step::Decide(decision)), _) => Ok(decision),
            (Some(Step::Fail(error)), _) => Err(error),
            (None, Some(decision)) => Ok(with_fresh_ids(decision)),
            (None, None) => Err(ModelError::InvalidResponse("script exhausted".into())),
        }
    }
}
