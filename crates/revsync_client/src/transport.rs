//! Transport layer abstraction for replication calls.

use crate::context::CallContext;
use crate::error::{ReplicationError, ReplicationResult};
use parking_lot::Mutex;
use revsync_codec::WireFormat;
use revsync_protocol::{ErrorBody, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Status every replication endpoint answers with on success.
pub const STATUS_OK: u16 = 200;

/// A transport carries one request to the remote side and returns its response.
///
/// This trait abstracts the network layer, allowing for different implementations
/// (HTTP, in-process servers, mocks for testing). Implementations should abort
/// an in-flight call when `ctx` is cancelled or expires, and must not retry.
pub trait Transport: Send + Sync {
    /// Performs one request/response exchange.
    fn request(&self, ctx: &CallContext, request: Request) -> ReplicationResult<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, ctx: &CallContext, request: Request) -> ReplicationResult<Response> {
        (**self).request(ctx, request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn request(&self, ctx: &CallContext, request: Request) -> ReplicationResult<Response> {
        (**self).request(ctx, request)
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    format: WireFormat,
}

impl Request {
    /// Creates a request without query or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            format: WireFormat::default(),
        }
    }

    /// Sets the body format.
    pub fn with_format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Serializes `body` in the request's format.
    pub fn with_body<T: Serialize + ?Sized>(mut self, body: &T) -> ReplicationResult<Self> {
        self.body = Some(self.format.to_vec(body)?);
        Ok(self)
    }

    /// Method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Path, without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Encoded body.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body format.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Decodes the body. Used by servers and test doubles.
    pub fn parse_body<T: DeserializeOwned>(&self) -> ReplicationResult<T> {
        let body = self
            .body
            .as_deref()
            .ok_or_else(|| ReplicationError::Decode("request has no body".into()))?;
        Ok(self.format.from_slice(body)?)
    }
}

/// A response from the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    body: Vec<u8>,
    format: WireFormat,
}

impl Response {
    /// Wraps a raw response.
    pub fn new(status: u16, format: WireFormat, body: Vec<u8>) -> Self {
        Self {
            status,
            body,
            format,
        }
    }

    /// Serializes `value` into a response body.
    pub fn encode<T: Serialize + ?Sized>(
        status: u16,
        format: WireFormat,
        value: &T,
    ) -> ReplicationResult<Self> {
        Ok(Self::new(status, format, format.to_vec(value)?))
    }

    /// Status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body format.
    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Fails unless the status equals `expected`.
    ///
    /// A server error envelope becomes [`ReplicationError::Remote`]; anything
    /// else becomes [`ReplicationError::UnexpectedStatus`].
    pub fn check_status(&self, expected: u16) -> ReplicationResult<()> {
        if self.status == expected {
            return Ok(());
        }
        match self.format.from_slice::<ErrorBody>(&self.body) {
            Ok(ErrorBody {
                error_num,
                error_message: Some(message),
                ..
            }) => Err(ReplicationError::Remote {
                status: self.status,
                error_num,
                message,
            }),
            _ => Err(ReplicationError::UnexpectedStatus {
                expected,
                status: self.status,
            }),
        }
    }

    /// Decodes the whole body.
    pub fn parse_body<T: DeserializeOwned>(&self) -> ReplicationResult<T> {
        Ok(self.format.from_slice(&self.body)?)
    }

    /// Splits an array body into one response per element, in order.
    pub fn parse_array(&self) -> ReplicationResult<Vec<Response>> {
        let elements = self.format.split_array(&self.body)?;
        Ok(elements
            .into_iter()
            .map(|body| Response::new(self.status, self.format, body))
            .collect())
    }
}

/// A scripted transport for testing.
///
/// Responses are returned in the order they were queued; every request that
/// reaches the transport is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<ReplicationResult<Response>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    /// Creates a mock with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: Response) {
        self.responses.lock().push_back(Ok(response));
    }

    /// Queues a JSON response with status 200.
    pub fn push_json<T: Serialize + ?Sized>(&self, value: &T) -> ReplicationResult<()> {
        self.push_response(Response::encode(STATUS_OK, WireFormat::Json, value)?);
        Ok(())
    }

    /// Queues a failure.
    pub fn push_error(&self, error: ReplicationError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.responses.lock().len()
    }
}

impl Transport for MockTransport {
    fn request(&self, ctx: &CallContext, request: Request) -> ReplicationResult<Response> {
        ctx.check()?;
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ReplicationError::Protocol("no mock response queued".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_protocol::RevisionId;

    #[test]
    fn request_builder() {
        let request = Request::new(Method::Put, "/x")
            .with_format(WireFormat::Cbor)
            .with_query("batchId", "7")
            .with_query("collection", "users")
            .with_body(&[RevisionId::new(1)])
            .unwrap();

        assert_eq!(request.method(), Method::Put);
        assert_eq!(request.query_param("collection"), Some("users"));
        assert_eq!(request.query_param("resume"), None);
        let body: Vec<RevisionId> = request.parse_body().unwrap();
        assert_eq!(body, vec![RevisionId::new(1)]);
    }

    #[test]
    fn check_status_ok() {
        let response = Response::new(200, WireFormat::Json, b"{}".to_vec());
        assert!(response.check_status(STATUS_OK).is_ok());
    }

    #[test]
    fn check_status_with_error_envelope() {
        let response = Response::encode(
            404,
            WireFormat::Json,
            &ErrorBody::new(404, 1203, "collection or view not found"),
        )
        .unwrap();
        match response.check_status(STATUS_OK) {
            Err(ReplicationError::Remote {
                status,
                error_num,
                message,
            }) => {
                assert_eq!(status, 404);
                assert_eq!(error_num, Some(1203));
                assert_eq!(message, "collection or view not found");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn check_status_without_envelope() {
        let response = Response::new(502, WireFormat::Json, b"<html>bad gateway</html>".to_vec());
        assert!(matches!(
            response.check_status(STATUS_OK),
            Err(ReplicationError::UnexpectedStatus {
                expected: 200,
                status: 502
            })
        ));
    }

    #[test]
    fn parse_array_elements_decode_independently() {
        let response = Response::encode(
            200,
            WireFormat::Cbor,
            &serde_json::json!([{"a": 1}, {"b": 2}]),
        )
        .unwrap();
        let elements = response.parse_array().unwrap();
        assert_eq!(elements.len(), 2);
        let second: serde_json::Value = elements[1].parse_body().unwrap();
        assert_eq!(second["b"], 2);
    }

    #[test]
    fn mock_returns_in_order_and_records() {
        let mock = MockTransport::new();
        mock.push_json(&[1, 2]).unwrap();
        mock.push_error(ReplicationError::transport_retryable("reset"));

        let ctx = CallContext::new();
        let first = mock.request(&ctx, Request::new(Method::Get, "/a")).unwrap();
        assert_eq!(first.parse_body::<Vec<i32>>().unwrap(), vec![1, 2]);
        assert!(mock.request(&ctx, Request::new(Method::Get, "/b")).is_err());
        assert!(matches!(
            mock.request(&ctx, Request::new(Method::Get, "/c")),
            Err(ReplicationError::Protocol(_))
        ));
        assert_eq!(mock.request_count(), 3);
        assert_eq!(mock.requests()[1].path(), "/b");
    }

    #[test]
    fn mock_honors_cancellation() {
        let mock = MockTransport::new();
        mock.push_json(&0).unwrap();
        let ctx = CallContext::new();
        ctx.cancel();
        assert!(matches!(
            mock.request(&ctx, Request::new(Method::Get, "/a")),
            Err(ReplicationError::Cancelled)
        ));
        assert_eq!(mock.request_count(), 0);
        assert_eq!(mock.pending(), 1);
    }
}
