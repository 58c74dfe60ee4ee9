//! Configuration for the replication client.

use revsync_codec::WireFormat;
use std::time::Duration;

/// Database used when none is configured.
pub const DEFAULT_DATABASE: &str = "_system";

/// Configuration for replication calls.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Database holding the collections.
    pub database: String,
    /// Body format for requests.
    pub wire_format: WireFormat,
    /// Maximum revisions per documents request. `None` sends them all at once.
    pub documents_batch_size: Option<usize>,
    /// Per round trip timeout, applied on top of the call context's deadline.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a configuration for `database`.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            wire_format: WireFormat::Json,
            documents_batch_size: None,
            request_timeout: None,
        }
    }

    /// Sets the body format.
    pub fn with_wire_format(mut self, format: WireFormat) -> Self {
        self.wire_format = format;
        self
    }

    /// Splits document fetches into requests of at most `size` revisions.
    pub fn with_documents_batch_size(mut self, size: usize) -> Self {
        self.documents_batch_size = Some(size.max(1));
        self
    }

    /// Sets the per round trip timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}
