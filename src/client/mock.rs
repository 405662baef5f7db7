//! Scripted [`LinkedInSource`] and [`ContactEnricher`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::{ContactEnricher, LinkedInSource, classify_status};
use crate::error::SyncError;

/// Canned answer for a point lookup.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Found(Value),
    NotFound,
    Status(u16),
}

impl Reply {
    fn resolve(&self, operation: &str) -> Result<Option<Value>, SyncError> {
        match self {
            Self::Found(value) => Ok(Some(value.clone())),
            Self::NotFound => Ok(None),
            Self::Status(code) => Err(classify_status(
                StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                operation,
                "scripted",
            )),
        }
    }
}

/// Replays listing bodies in order and answers lookups from a table.
///
/// Once the script is exhausted every listing call returns an empty page.
#[derive(Debug, Default)]
pub(crate) struct MockLinkedIn {
    users: HashMap<String, Reply>,
    bodies: Mutex<VecDeque<Result<Value, SyncError>>>,
    calls: Mutex<Vec<String>>,
}

impl MockLinkedIn {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_user(mut self, identifier: &str, reply: Reply) -> Self {
        self.users.insert(identifier.to_string(), reply);
        self
    }

    pub(crate) fn with_bodies(self, bodies: Vec<Result<Value, SyncError>>) -> Self {
        if let Ok(mut queue) = self.bodies.lock() {
            queue.extend(bodies);
        }
        self
    }

    /// Every call made so far, as `operation:detail` strings.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of calls whose label starts with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_body(&self) -> Result<Value, SyncError> {
        self.bodies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| Ok(json!({ "items": [], "data": [] })))
    }
}

#[async_trait]
impl LinkedInSource for MockLinkedIn {
    async fn raw_route(&self, account_id: &str, request_url: &str) -> Result<Value, SyncError> {
        self.record(format!("raw_route:{account_id}:{request_url}"));
        self.next_body()
    }

    async fn get_user(
        &self,
        _account_id: &str,
        identifier: &str,
    ) -> Result<Option<Value>, SyncError> {
        self.record(format!("get_user:{identifier}"));
        self.users
            .get(identifier)
            .map_or(Ok(None), |reply| reply.resolve("get_user"))
    }

    async fn search(
        &self,
        account_id: &str,
        search_url: &str,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError> {
        self.record(format!(
            "search:{account_id}:{search_url}:{}",
            cursor.unwrap_or("-")
        ));
        self.next_body()
    }

    async fn relations(
        &self,
        account_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError> {
        self.record(format!(
            "relations:{account_id}:{limit}:{}",
            cursor.unwrap_or("-")
        ));
        self.next_body()
    }
}

/// Enricher answering from a table keyed by public identifier.
#[derive(Debug, Default)]
pub(crate) struct MockEnricher {
    profiles: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl MockEnricher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_profile(mut self, identifier: &str, reply: Reply) -> Self {
        self.profiles.insert(identifier.to_string(), reply);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContactEnricher for MockEnricher {
    async fn enrich(&self, public_identifier: &str) -> Result<Option<Value>, SyncError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(public_identifier.to_string());
        }
        self.profiles
            .get(public_identifier)
            .map_or(Ok(None), |reply| reply.resolve("enrich"))
    }
}
