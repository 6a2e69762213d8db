#![allow(dead_code)]

use async_trait::async_trait;
use licman_http::{
    ConnectionOptions, Credentials, HttpClient, Request, Response, Transport, TransportError,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Replays canned replies and records every request it was given.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Response, TransportError>>>,
    pub seen: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn replying(code: u16, body: &str) -> Arc<Self> {
        let mock = Self::default();
        mock.push(code, body);
        Arc::new(mock)
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let mock = Self::default();
        mock.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::new(message)));
        Arc::new(mock)
    }

    pub fn push(&self, code: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(Response::new(code, BTreeMap::new(), body)));
    }

    pub fn last(&self) -> Request {
        self.seen.lock().unwrap().last().cloned().unwrap()
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("no reply queued")))
    }
}

pub fn options() -> ConnectionOptions {
    ConnectionOptions {
        oauth_timestamp: Some(1_700_000_000),
        ..ConnectionOptions::new("lmfwc")
    }
}

pub fn client(server: &str, transport: Arc<MockTransport>) -> HttpClient {
    HttpClient::with_transport(
        server,
        Credentials::new("ck_test", "cs_test"),
        options(),
        "https://www.client-site.test",
        transport,
    )
    .unwrap()
}
