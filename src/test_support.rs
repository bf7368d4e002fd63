// In-memory fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::api::Backend;
use crate::coordinator::{Coordinator, ManualClock};
use crate::error::{Result, TailorError};
use crate::render::PanelRenderer;
use crate::state::PanelView;
use crate::storage::MemoryStore;

pub type TestCoordinator = Coordinator<MemoryStore, FakeBackend, RecordingRenderer, ManualClock>;

pub fn coordinator(store: MemoryStore, backend: FakeBackend) -> TestCoordinator {
    Coordinator::new(store, backend, RecordingRenderer::default(), ManualClock::default())
}

/// One request seen by [`FakeBackend`].
#[derive(Debug, Clone)]
pub struct Call {
    pub endpoint: String,
    pub method: Method,
    pub body: Option<Value>,
    pub file_name: Option<String>,
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Backend answering from per-endpoint queues. Endpoints with nothing queued
/// answer `NotFound`.
#[derive(Default)]
pub struct FakeBackend {
    responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
    calls: Mutex<Vec<Call>>,
    tokens: Mutex<Vec<Option<String>>>,
    hooks: Mutex<HashMap<String, Hook>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next answer for `endpoint`.
    pub fn respond(&self, endpoint: &str, response: Result<Value>) {
        self.responses
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(response);
    }

    /// Run `hook` while a request to `endpoint` is in flight.
    pub fn on_call(&self, endpoint: &str, hook: impl Fn() + Send + Sync + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Box::new(hook));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Every token handed to `set_token`, in order.
    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }

    fn answer(&self, call: Call) -> Result<Value> {
        let endpoint = call.endpoint.clone();
        self.calls.lock().unwrap().push(call);

        if let Some(hook) = self.hooks.lock().unwrap().get(&endpoint) {
            hook();
        }

        self.responses
            .lock()
            .unwrap()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(TailorError::NotFound(endpoint.clone())))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn call(&self, endpoint: &str, method: Method, body: Option<Value>) -> Result<Value> {
        self.answer(Call {
            endpoint: endpoint.to_string(),
            method,
            body,
            file_name: None,
        })
    }

    async fn upload(&self, endpoint: &str, file_name: &str, _bytes: Vec<u8>) -> Result<Value> {
        self.answer(Call {
            endpoint: endpoint.to_string(),
            method: Method::POST,
            body: None,
            file_name: Some(file_name.to_string()),
        })
    }

    /// Answers queued as a JSON string come back as that string's bytes.
    async fn download(&self, endpoint: &str, body: Value) -> Result<Vec<u8>> {
        let data = self.answer(Call {
            endpoint: endpoint.to_string(),
            method: Method::POST,
            body: Some(body),
            file_name: None,
        })?;
        Ok(match data {
            Value::String(text) => text.into_bytes(),
            other => serde_json::to_vec(&other)?,
        })
    }

    fn set_token(&self, token: Option<String>) {
        self.tokens.lock().unwrap().push(token);
    }
}

/// Renderer that remembers every view it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub shown: Vec<PanelView>,
}

impl RecordingRenderer {
    pub fn last(&self) -> Option<&PanelView> {
        self.shown.last()
    }
}

impl PanelRenderer for RecordingRenderer {
    fn show(&mut self, view: &PanelView) {
        self.shown.push(view.clone());
    }
}
