//! Event receiver with polling.

use crate::client::ChatClient;
use crate::types::*;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::{debug, error};

/// Back-off after a failed poll.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Event receiver that polls the gateway bridge.
pub struct EventReceiver {
    client: ChatClient,
    poll_interval: Duration,
}

impl EventReceiver {
    /// Create a new event receiver.
    pub fn new(client: ChatClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Start receiving events as an async stream.
    pub fn stream(self) -> impl Stream<Item = IncomingEvent> {
        async_stream::stream! {
            loop {
                match self.client.receive().await {
                    Ok(events) => {
                        for event in events {
                            debug!("Received event: {}", event_kind(&event));
                            yield event;
                        }
                    }
                    Err(e) => {
                        error!("Receive error: {}", e);
                        sleep(ERROR_BACKOFF).await;
                        continue;
                    }
                }

                sleep(self.poll_interval).await;
            }
        }
    }
}

fn event_kind(event: &IncomingEvent) -> &'static str {
    match event {
        IncomingEvent::Ready { .. } => "ready",
        IncomingEvent::MessageCreate(_) => "message_create",
        IncomingEvent::ReactionAdd(_) => "reaction_add",
        IncomingEvent::ReactionRemove(_) => "reaction_remove",
        IncomingEvent::MemberJoin { .. } => "member_join",
        IncomingEvent::MemberLeave { .. } => "member_leave",
    }
}
