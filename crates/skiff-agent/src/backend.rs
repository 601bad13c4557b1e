//! Inference backend boundary
//!
//! The agent loop only needs one operation from a model provider: given the
//! transcript and the tool catalog, return the next model turn plus usage.

use async_trait::async_trait;
use skiff_core::{Part, Result, SkiffError, ToolDefinition, Transcript, Usage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// One model response
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Text and tool-call parts, in the order the model produced them
    pub parts: Vec<Part>,
    pub usage: Usage,
}

impl Completion {
    pub fn new(parts: Vec<Part>, usage: Usage) -> Self {
        Self { parts, usage }
    }

    /// A text-only response
    pub fn text(content: impl Into<String>, usage: Usage) -> Self {
        Self::new(vec![Part::text(content)], usage)
    }
}

/// A model provider
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Request the next model turn. Both text and tool calls are acceptable
    /// output. Implementations do not retry.
    async fn complete(&self, transcript: &Transcript, tools: &[ToolDefinition])
        -> Result<Completion>;
}

#[async_trait]
impl<B: InferenceBackend + ?Sized> InferenceBackend for Arc<B> {
    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        (**self).complete(transcript, tools).await
    }
}

#[async_trait]
impl<B: InferenceBackend + ?Sized> InferenceBackend for Box<B> {
    async fn complete(
        &self,
        transcript: &Transcript,
        tools: &[ToolDefinition],
    ) -> Result<Completion> {
        (**self).complete(transcript, tools).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Backend that replays a fixed script of responses.
///
/// Each call pops the next scripted response; once the script is empty the
/// fallback (if any) is returned forever, otherwise the call fails. Every
/// transcript the backend was sent is recorded for inspection.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<std::result::Result<Completion, String>>>,
    fallback: Option<Completion>,
    seen: Mutex<Vec<Transcript>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response
    pub fn with_completion(self, completion: Completion) -> Self {
        lock(&self.script).push_back(Ok(completion));
        self
    }

    /// Queue a backend failure
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Err(message.into()));
        self
    }

    /// Response returned once the script runs out
    pub fn always(mut self, completion: Completion) -> Self {
        self.fallback = Some(completion);
        self
    }

    /// Number of completion requests received
    pub fn requests(&self) -> usize {
        lock(&self.seen).len()
    }

    /// Snapshot of every transcript sent, in order
    pub fn transcripts(&self) -> Vec<Transcript> {
        lock(&self.seen).clone()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    async fn complete(
        &self,
        transcript: &Transcript,
        _tools: &[ToolDefinition],
    ) -> Result<Completion> {
        lock(&self.seen).push(transcript.clone());

        match lock(&self.script).pop_front() {
            Some(Ok(completion)) => Ok(completion),
            Some(Err(message)) => Err(SkiffError::Backend(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| SkiffError::Backend("script exhausted".to_string())),
        }
    }
}
