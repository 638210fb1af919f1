//! Outgoing mail
//!
//! Delivery goes through an [`EmailSender`]. Mail is never part of a
//! request's success: it is sent from a background task and failures are
//! only logged.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::state::AppState;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    /// Template name; rendering belongs to the sender.
    pub template: String,
    pub data: Value,
}

impl EmailMessage {
    pub fn new(
        state: &AppState,
        to: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            from: state.config.email.from_address.clone(),
            to: to.into(),
            subject: subject.into(),
            template: template.into(),
            data,
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Sender that logs every message and keeps it in an outbox.
#[derive(Clone, Default)]
pub struct LogMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if !message.to.contains('@') {
            return Err(EmailError::InvalidAddress(message.to.clone()));
        }

        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            template = %message.template,
            "email sent"
        );
        self.outbox
            .lock()
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .push(message.clone());
        Ok(())
    }
}

/// Send without waiting. Failures are logged and dropped.
pub fn send_in_background(state: &AppState, message: EmailMessage) {
    let mailer = Arc::clone(&state.mailer);
    tokio::spawn(async move {
        if let Err(err) = mailer.send(&message).await {
            tracing::warn!(error = %err, to = %message.to, "email delivery failed");
        }
    });
}
