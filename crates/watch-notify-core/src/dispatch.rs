use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use watch_notify_sources::{DispatchError, MessageTransport};

pub const DEFAULT_MESSAGE_DELAY: Duration = Duration::from_millis(500);

/// Sends the two-message announcement for one item
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn MessageTransport>,
    delay: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            delay: DEFAULT_MESSAGE_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// First message as text, then after the delay the details: a photo with
    /// caption when there is artwork, otherwise the same body as text.
    /// A failed first send means the second is never attempted.
    pub async fn send_sequence(
        &self,
        chat_id: &str,
        first_text: &str,
        second_text: &str,
        artwork_url: Option<&str>,
    ) -> Result<(), DispatchError> {
        self.transport.send_text(chat_id, first_text).await?;
        debug!(delay_ms = self.delay.as_millis() as u64, "First message sent");

        tokio::time::sleep(self.delay).await;

        match artwork_url {
            Some(url) => self.transport.send_photo(chat_id, url, second_text).await,
            None => self.transport.send_text(chat_id, second_text).await,
        }
    }
}
