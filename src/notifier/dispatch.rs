use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::catalog::message_for;
use super::classifier::StatusResult;
use crate::db::models::Subscriber;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("push transport failed: {0}")]
    Transport(String),
    #[error("subscriber {0} has no push token")]
    MissingToken(i64),
    #[error("subscriber {0} not found")]
    UnknownSubscriber(i64),
    #[error("delivery history write failed: {0}")]
    History(String),
}

/// Push delivery to one device token.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<(), DispatchError>;

    fn name(&self) -> &str;
}

/// Append-only per-subscriber delivery log.
pub trait DeliveryHistory: Send + Sync {
    fn record_notification(
        &self,
        user_id: i64,
        title: &str,
        message: &str,
    ) -> Result<(), DispatchError>;
}

#[derive(Debug)]
pub enum PushResult {
    Sent,
    /// Token already received this message earlier in the batch.
    DuplicateToken,
    Failed(DispatchError),
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub user_id: i64,
    pub push: PushResult,
    /// `None` when the subscriber was rejected before the record step.
    pub record: Option<Result<(), DispatchError>>,
}

impl DispatchOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.push, PushResult::Failed(_)) || !matches!(self.record, Some(Ok(())))
    }
}

#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn pushes_sent(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.push, PushResult::Sent))
            .count()
    }

    pub fn records_created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.record, Some(Ok(()))))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Fans one message out to every subscriber, one push per distinct token.
pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    history: Arc<dyn DeliveryHistory>,
    title: String,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        history: Arc<dyn DeliveryHistory>,
        title: &str,
    ) -> Self {
        Dispatcher {
            transport,
            history,
            title: title.to_string(),
        }
    }

    /// Never fails as a whole: each subscriber's problems are captured in
    /// its own outcome and the loop moves on.
    pub async fn dispatch(
        &self,
        result: &StatusResult,
        subscribers: &[Subscriber],
    ) -> DispatchReport {
        let Some(message) = message_for(result) else {
            debug!("Nothing to dispatch for '{}'", result.status);
            return DispatchReport::default();
        };

        let mut sent_tokens: HashSet<&str> = HashSet::new();
        let mut report = DispatchReport::default();

        for sub in subscribers {
            let token = match sub.push_token.as_deref().filter(|t| !t.is_empty()) {
                Some(t) => t,
                None => {
                    let err = DispatchError::MissingToken(sub.user_id);
                    warn!("Could not send push notification: {}", err);
                    report.outcomes.push(DispatchOutcome {
                        user_id: sub.user_id,
                        push: PushResult::Failed(err),
                        record: None,
                    });
                    continue;
                }
            };

            let push = if sent_tokens.contains(token) {
                PushResult::DuplicateToken
            } else {
                match self.transport.send(token, &self.title, &message).await {
                    Ok(()) => {
                        sent_tokens.insert(token);
                        PushResult::Sent
                    }
                    Err(e) => {
                        warn!(
                            "Could not send push notification to user {} via {}: {}",
                            sub.user_id,
                            self.transport.name(),
                            e
                        );
                        PushResult::Failed(e)
                    }
                }
            };

            let record = self
                .history
                .record_notification(sub.user_id, &self.title, &message);
            if let Err(e) = &record {
                warn!("Could not record notification for user {}: {}", sub.user_id, e);
            }

            report.outcomes.push(DispatchOutcome {
                user_id: sub.user_id,
                push,
                record: Some(record),
            });
        }

        info!(
            "Dispatched '{}': {} push(es), {} record(s), {} failure(s) across {} subscriber(s)",
            result.status,
            report.pushes_sent(),
            report.records_created(),
            report.failures(),
            subscribers.len()
        );
        report
    }
}
