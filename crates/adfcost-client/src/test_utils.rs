//! Shared test utilities for unit tests
//!
//! Integration tests (in the workspace root `tests/`) cannot see this module
//! because it is `#[cfg(test)]`; they keep their own copy in
//! `tests/common/mod.rs`.

use crate::credential::TokenSource;
use crate::transport::Transport;
use adfcost_core::error::{AdfCostError, Result};
use adfcost_core::types::Credential;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One canned reply
pub enum Reply {
    Json(Value),
    Status(u16),
}

/// A request the transport saw
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub url: String,
    pub auth_header: Option<String>,
    pub body: Option<Value>,
}

/// Transport that replays queued replies per URL
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: &str, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn next(&self, request: SeenRequest) -> Result<Value> {
        let url = request.url.clone();
        self.seen.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front);
        match reply {
            Some(Reply::Json(value)) => Ok(value),
            Some(Reply::Status(status)) => Err(AdfCostError::Http {
                status,
                url,
                message: "scripted failure".to_string(),
            }),
            None => Err(AdfCostError::Http {
                status: 404,
                url,
                message: "no scripted reply".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, auth_header: &str, body: &Value) -> Result<Value> {
        self.next(SeenRequest {
            url: url.to_string(),
            auth_header: Some(auth_header.to_string()),
            body: Some(body.clone()),
        })
    }

    async fn get_json(&self, url: &str, auth_header: Option<&str>) -> Result<Value> {
        self.next(SeenRequest {
            url: url.to_string(),
            auth_header: auth_header.map(str::to_string),
            body: None,
        })
    }
}

/// Token source issuing numbered one-hour tokens
#[derive(Default)]
pub struct NumberedTokens {
    issued: AtomicUsize,
}

#[async_trait]
impl TokenSource for NumberedTokens {
    async fn fetch_credential(&self) -> Result<Credential> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(Credential::bearer(
            &format!("token-{n}"),
            Utc::now() + Duration::hours(1),
        ))
    }

    fn name(&self) -> &'static str {
        "numbered"
    }
}
