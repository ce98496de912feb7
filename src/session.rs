use crate::collector::AnswerCollector;
use crate::error::{AdvisorError, Result};
use crate::models::Quiz;
use crate::pipeline::Pipeline;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-session answer state keyed by session id.
///
/// Every session owns its own [`AnswerCollector`]; the quiz definition and the
/// pipeline are shared read-only.
pub struct SessionStore {
    quiz: Arc<Quiz>,
    pipeline: Pipeline,
    sessions: Mutex<HashMap<Uuid, AnswerCollector>>,
}

impl SessionStore {
    pub fn new(quiz: Arc<Quiz>, pipeline: Pipeline) -> Self {
        Self {
            quiz,
            pipeline,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn quiz(&self) -> &Arc<Quiz> {
        &self.quiz
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Start a fresh session and return its id
    pub fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .lock()
            .insert(id, AnswerCollector::new(Arc::clone(&self.quiz)));
        debug!("Created session {}", id);
        id
    }

    /// Run `f` against the collector owned by session `id`
    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut AnswerCollector) -> T,
    ) -> Result<T> {
        let mut sessions = self.sessions.lock();
        let collector = sessions
            .get_mut(&id)
            .ok_or_else(|| AdvisorError::invalid_state(format!("unknown session {}", id)))?;
        Ok(f(collector))
    }

    /// Drop a finished session. Returns false if it did not exist.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.lock().remove(&id).is_some();
        if removed {
            debug!("Removed session {}", id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }
}
