use thiserror::Error;

/// Failure talking to a read-side upstream (history feed, metadata, ratings)
#[derive(Debug, Error)]
pub enum SourceError {
    /// Non-success response; keeps the raw status and body so callers can
    /// tell rate limiting from auth failures
    #[error("{service} API error: {status} - {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode {service} response: {source}")]
    Decode {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Request failure with the URL stripped, since it can carry an API key
    pub fn http(service: &'static str, source: reqwest::Error) -> Self {
        SourceError::Http {
            service,
            source: source.without_url(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Upstream { status, .. } => Some(*status),
            SourceError::Http { source, .. } => source.status().map(|s| s.as_u16()),
            SourceError::Decode { .. } => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(429)
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Failure sending to the messaging channel
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Telegram {method} error: {status} - {body}")]
    Rejected {
        method: &'static str,
        status: u16,
        body: String,
    },

    #[error("Telegram {method} request failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl DispatchError {
    /// Transport failure with the URL stripped; the bot token is in the path
    pub fn transport(method: &'static str, source: reqwest::Error) -> Self {
        DispatchError::Transport {
            method,
            source: source.without_url(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            DispatchError::Rejected { status, .. } => Some(*status),
            DispatchError::Transport { .. } => None,
        }
    }

    /// Errors no later item can recover from: bad token, bot blocked or
    /// removed from the chat, unknown bot. The run stops on these.
    pub fn is_fatal(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403) | Some(404))
    }
}
