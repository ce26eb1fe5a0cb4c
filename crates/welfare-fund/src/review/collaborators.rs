use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ActorRole, ApplicationId, ApplicationStatus, AuditEntry};

/// Emitted after every accepted transition for the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub application_id: ApplicationId,
    pub from_status: Option<ApplicationStatus>,
    pub to_status: ApplicationStatus,
    pub actor_role: ActorRole,
    pub timestamp: DateTime<Utc>,
}

impl From<&AuditEntry> for TransitionEvent {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            application_id: entry.application_id.clone(),
            from_status: entry.from_status,
            to_status: entry.to_status,
            actor_role: entry.actor_role,
            timestamp: entry.timestamp,
        }
    }
}

/// Outbound hook turning transitions into user-visible messages (e-mail, inbox, ...).
pub trait TransitionNotifier: Send + Sync {
    fn notify(&self, event: TransitionEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Notifier that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl TransitionNotifier for NoopNotifier {
    fn notify(&self, _event: TransitionEvent) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Notifier that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<TransitionEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<TransitionEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TransitionNotifier for RecordingNotifier {
    fn notify(&self, event: TransitionEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|_| NotifyError::Transport("event buffer poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

/// Answers whether the document store holds a receipt for an application.
pub trait DocumentConfirmation: Send + Sync {
    fn receipt_attached(&self, id: &ApplicationId) -> bool;
}

/// In-memory set of applications whose receipt has been stored.
#[derive(Debug, Default)]
pub struct ReceiptRegistry {
    attached: Mutex<HashSet<ApplicationId>>,
}

impl ReceiptRegistry {
    pub fn attach(&self, id: ApplicationId) {
        let mut guard = match self.attached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(id);
    }
}

impl DocumentConfirmation for ReceiptRegistry {
    fn receipt_attached(&self, id: &ApplicationId) -> bool {
        match self.attached.lock() {
            Ok(guard) => guard.contains(id),
            Err(poisoned) => poisoned.into_inner().contains(id),
        }
    }
}
