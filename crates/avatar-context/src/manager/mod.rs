//! Context manager
//!
//! - `context_manager`: the [`ContextManager`] orchestrator
//! - `builder`: context assembly, conversation flow and themes
//! - `analysis`: relevance, tone, topics and user intent
//! - `session`: per-session state
//! - `events`: synchronous event emitter

pub mod analysis;
pub mod builder;
pub mod context_manager;
pub mod events;
pub mod session;

pub use analysis::{
    analyze_context, detect_intent, ContextAnalysis, EmotionalTone, IntentKind, UserIntent,
};
pub use builder::ContextBuilder;
pub use context_manager::{ContextManager, ContextStats};
pub use events::{EventEmitter, EventListener, ListenerId};
pub use session::{EnvironmentOverrides, SessionState, SessionStats};
