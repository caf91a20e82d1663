//! Per-session state owned by the manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConversationFlow, ConversationTheme, SessionContext, UserProfile};

/// Device and network labels supplied by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentOverrides {
    pub device: Option<String>,
    pub network: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub message_count: u64,
    pub objectives: Vec<String>,
    pub themes: Vec<ConversationTheme>,
    pub flow: ConversationFlow,
    pub environment: EnvironmentOverrides,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            start_time: Utc::now(),
            message_count: 0,
            objectives: Vec::new(),
            themes: Vec::new(),
            flow: ConversationFlow::default(),
            environment: EnvironmentOverrides::default(),
        }
    }

    /// Count a message, pulling the session start back for replayed
    /// messages that predate it.
    pub fn observe(&mut self, at: DateTime<Utc>) {
        self.message_count += 1;
        if at < self.start_time {
            self.start_time = at;
        }
    }

    /// Seconds between session start and `at`, never negative.
    pub fn duration_secs(&self, at: DateTime<Utc>) -> u64 {
        u64::try_from((at - self.start_time).num_seconds()).unwrap_or(0)
    }

    pub fn session_context(&self, profile: &UserProfile) -> SessionContext {
        SessionContext {
            session_id: self.session_id.clone(),
            user_profile: profile.clone(),
            objectives: self.objectives.clone(),
            themes: self.themes.clone(),
            start_time: self.start_time,
            message_count: self.message_count,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Session figures reported by `get_context_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    pub message_count: u64,
    pub duration_secs: u64,
    pub theme_count: usize,
    pub phase: crate::types::ConversationPhase,
}

impl SessionStats {
    pub fn from_state(state: &SessionState) -> Self {
        Self {
            session_id: state.session_id.clone(),
            start_time: state.start_time,
            message_count: state.message_count,
            duration_secs: state.duration_secs(Utc::now()),
            theme_count: state.themes.len(),
            phase: state.flow.phase,
        }
    }
}
