//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::{Headers, Response, Transport, TransportError, TransportRequest};

/// What the transport does with the next request.
pub(crate) enum Reply {
    /// Settle immediately with this result.
    Settle(Result<Response, TransportError>),
    /// Stay pending until the request's signal or cancel token fires, then
    /// reject with [`TransportError::Cancelled`].
    UntilCancelled,
}

/// Records every request and answers from a scripted queue.
///
/// An empty queue answers with a precognitive 204.
#[derive(Clone, Default)]
pub(crate) struct RecordingTransport {
    base_url: Option<String>,
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_owned());
        self
    }

    pub(crate) fn reply(&self, reply: Reply) -> &Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn respond(&self, result: Result<Response, TransportError>) -> &Self {
        self.reply(Reply::Settle(result))
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn last_request(&self) -> TransportRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: TransportRequest) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();

        match reply {
            Some(Reply::Settle(result)) => result,
            Some(Reply::UntilCancelled) => {
                request.cancelled().await;
                Err(TransportError::Cancelled)
            }
            None => Ok(precognitive(204, Value::Null)),
        }
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

/// A response carrying the precognition marker.
pub(crate) fn precognitive(status: u16, data: Value) -> Response {
    Response {
        status,
        headers: [("precognition", "true")].into_iter().collect(),
        data,
    }
}

/// A response without the marker.
pub(crate) fn plain(status: u16) -> Response {
    Response {
        status,
        headers: Headers::new(),
        data: Value::Null,
    }
}
