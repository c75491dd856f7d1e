//! Session identity tracking. Sessions are never implicitly resumed: once
//! the field empties out, the next valid identity is a fresh session even if
//! the tuple was seen before.

use crate::telemetry::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// No active session; the display should show its reset state.
    NoSession,
    /// A new session began; all session-scoped state must be reset.
    Started,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct SessionTracker {
    current: Option<SessionId>,
}

impl SessionTracker {
    pub fn new() -> SessionTracker {
        SessionTracker::default()
    }

    pub fn update(&mut self, observed: Option<&SessionId>) -> SessionTransition {
        match observed {
            None => {
                self.current = None;
                SessionTransition::NoSession
            }
            Some(id) => {
                if self.current.as_ref() == Some(id) {
                    SessionTransition::Unchanged
                } else {
                    self.current = Some(id.clone());
                    SessionTransition::Started
                }
            }
        }
    }

    pub fn current(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }
}
