//! Result log collector actor.
//!
//! Executors never share the log buffer: each finished job sends its entries
//! to a per-batch actor, and the submitter drains the buffer once the batch
//! latch is released. The mailbox is FIFO, so every append sent before the
//! final count-down is applied before the drain request.

use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use scrape_core::{LogEntry, QueueError};
use tokio::task::JoinHandle;

/// Messages for the `LogCollector`.
#[derive(Debug)]
pub enum CollectorMessage {
    /// Append the entries of one finished (or rejected) job.
    Append(Vec<LogEntry>),

    /// Hand back everything collected so far.
    Drain { reply: RpcReplyPort<Vec<LogEntry>> },
}

/// Actor owning one batch's result log.
pub struct LogCollector;

impl Actor for LogCollector {
    type Msg = CollectorMessage;
    type State = Vec<LogEntry>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(Vec::new())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CollectorMessage::Append(entries) => state.extend(entries),
            CollectorMessage::Drain { reply } => {
                let _ = reply.send(std::mem::take(state));
            }
        }
        Ok(())
    }
}

/// Handle to a running collector.
///
/// Dropping the handle without draining (a cancelled submission) stops the
/// actor, so an abandoned batch never outlives its submitter.
pub struct ResultLog {
    actor: ActorRef<CollectorMessage>,
    handle: Option<JoinHandle<()>>,
}

impl ResultLog {
    pub async fn spawn() -> Result<Self, QueueError> {
        let (actor, handle) = Actor::spawn(None, LogCollector, ())
            .await
            .map_err(|e| QueueError::Collector(format!("Failed to spawn collector: {e}")))?;
        Ok(Self {
            actor,
            handle: Some(handle),
        })
    }

    /// Address that trackers send their entries to.
    pub fn sink(&self) -> ActorRef<CollectorMessage> {
        self.actor.clone()
    }

    /// Collect every appended entry and stop the actor.
    pub async fn drain(mut self) -> Result<Vec<LogEntry>, QueueError> {
        let result = ractor::rpc::call(
            &self.actor,
            |reply| CollectorMessage::Drain { reply },
            None,
        )
        .await;

        self.actor.stop(None);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }

        match result {
            Ok(ractor::rpc::CallResult::Success(entries)) => Ok(entries),
            Ok(ractor::rpc::CallResult::Timeout) => {
                Err(QueueError::Collector("drain timed out".into()))
            }
            Ok(ractor::rpc::CallResult::SenderError) => {
                Err(QueueError::Collector("collector dropped the reply".into()))
            }
            Err(e) => Err(QueueError::Collector(e.to_string())),
        }
    }
}

impl Drop for ResultLog {
    fn drop(&mut self) {
        if self.handle.is_some() {
            tracing::debug!(
                actor = %self.actor.get_id(),
                "Result log abandoned, stopping collector"
            );
            self.actor.stop(None);
        }
    }
}
