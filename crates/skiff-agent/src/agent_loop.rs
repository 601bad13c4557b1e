//! Agent loop driver
//!
//! Runs one user turn at a time: call the model, dispatch any tool calls,
//! append results, repeat until the model answers in plain text or the
//! iteration cap is hit. Control flow comes from [`crate::state::transition`];
//! this module performs the actions it returns.

use crate::backend::InferenceBackend;
use crate::context::ContextManager;
use crate::state::{transition, Action, Event, State, Stop};
use skiff_core::{
    Part, SkiffConfig, ToolCallPart, ToolDefinition, ToolResultPart, Transcript, Turn,
    UsageCounters,
};
use skiff_tools::audit::audit_log_of;
use skiff_tools::Dispatcher;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Loop settings
#[derive(Debug, Clone, PartialEq)]
pub struct LoopConfig {
    /// Model calls allowed per user turn
    pub max_iterations: usize,
    pub context: ContextManager,
}

impl LoopConfig {
    pub fn from_config(config: &SkiffConfig) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            context: ContextManager::from_settings(&config.context),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_config(&SkiffConfig::default())
    }
}

/// How a user turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Text of the model's final response
    Completed { text: String },
    MaxIterations,
    BackendFailed { message: String },
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnOutcome::Completed { text } => f.write_str(text),
            TurnOutcome::MaxIterations => f.write_str("Maximum iterations reached."),
            TurnOutcome::BackendFailed { message } => write!(f, "Error: {}", message),
        }
    }
}

/// Progress reported while a turn runs
#[derive(Debug, Clone, PartialEq)]
pub enum LoopEvent {
    /// A text part from the model
    ModelText { text: String },
    /// A tool call and its result
    ToolFinished {
        call: ToolCallPart,
        audit_log: Option<String>,
        result: ToolResultPart,
    },
    /// Context trimming removed turns
    Trimmed { removed: usize, remaining: usize },
    IterationCapReached { max_iterations: usize },
}

/// Receives [`LoopEvent`]s, e.g. for rendering
pub trait LoopObserver: Send {
    fn on_event(&mut self, event: LoopEvent);
}

impl<F: FnMut(LoopEvent) + Send> LoopObserver for F {
    fn on_event(&mut self, event: LoopEvent) {
        self(event)
    }
}

/// Owns the transcript and usage counters for one conversation
pub struct AgentLoop<B: InferenceBackend> {
    backend: B,
    dispatcher: Dispatcher,
    tools: Vec<ToolDefinition>,
    transcript: Transcript,
    usage: UsageCounters,
    config: LoopConfig,
    observer: Option<Box<dyn LoopObserver>>,
}

impl<B: InferenceBackend> AgentLoop<B> {
    pub fn new(
        backend: B,
        dispatcher: Dispatcher,
        system_prompt: impl Into<String>,
        config: LoopConfig,
    ) -> Self {
        let tools = dispatcher.catalog();
        Self {
            backend,
            dispatcher,
            tools,
            transcript: Transcript::new(system_prompt),
            usage: UsageCounters::default(),
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: impl LoopObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn usage(&self) -> &UsageCounters {
        &self.usage
    }

    pub fn sandbox_root(&self) -> &Path {
        self.dispatcher.sandbox().root()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn emit(&mut self, event: LoopEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(event);
        }
    }

    /// Trim against the most recent usage observation
    fn check_trim(&mut self) {
        let removed = self
            .config
            .context
            .trim(&mut self.transcript, self.usage.last_input_tokens);
        if removed > 0 {
            let remaining = self.transcript.len();
            self.emit(LoopEvent::Trimmed { removed, remaining });
        }
    }

    /// Call the model and append its turn. Returns the next event.
    async fn call_model(&mut self, iteration: usize, failure: &mut Option<String>) -> Event {
        debug!(
            "Iteration {} of {}: requesting model",
            iteration, self.config.max_iterations
        );

        let completion = match self.backend.complete(&self.transcript, &self.tools).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Inference call failed: {}", e);
                *failure = Some(e.to_string());
                return Event::BackendFailed;
            }
        };

        self.usage.record(&completion.usage);
        debug!(
            "Usage: +{} input, +{} output (totals {} / {}, {} requests)",
            completion.usage.input_tokens,
            completion.usage.output_tokens,
            self.usage.input_tokens,
            self.usage.output_tokens,
            self.usage.requests
        );

        let mut tool_calls = 0;
        for part in &completion.parts {
            match part {
                Part::Text { content } => {
                    let text = content.clone();
                    self.emit(LoopEvent::ModelText { text });
                }
                Part::ToolCall(_) => tool_calls += 1,
            }
        }

        self.transcript.push_model(completion.parts);
        Event::ModelResponded { tool_calls }
    }

    /// Dispatch the tool calls of the latest model turn, in order
    async fn execute_tools(&mut self) -> Event {
        let calls: Vec<ToolCallPart> = self
            .transcript
            .last()
            .map(|turn| turn.tool_calls().cloned().collect())
            .unwrap_or_default();

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self
                .dispatcher
                .dispatch(&call.tool_name, &call.arguments, &call.call_id)
                .await;
            let audit_log = audit_log_of(&call.arguments);
            self.emit(LoopEvent::ToolFinished {
                call,
                audit_log,
                result: result.clone(),
            });
            results.push(result);
        }

        self.transcript.push_tool_results(results);
        Event::ToolsFinished
    }

    /// Text of the most recent model turn
    fn final_text(&self) -> String {
        match self.transcript.last() {
            Some(Turn::Model { parts }) => parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text { content } => Some(content.as_str()),
                    Part::ToolCall(_) => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    /// Run one user turn to completion
    #[instrument(skip(self, input), fields(input_len = input.len()))]
    pub async fn run_turn(&mut self, input: &str) -> TurnOutcome {
        self.transcript.push_user(input);

        let mut state = State::AwaitingUserInput;
        let mut event = Event::UserInput;
        let mut failure: Option<String> = None;

        loop {
            let (next, actions) = transition(state, event, self.config.max_iterations);
            state = next;

            if let State::Failed { error } = &state {
                warn!("{}", error);
                return TurnOutcome::BackendFailed {
                    message: error.clone(),
                };
            }

            let mut next_event = None;
            for action in actions {
                match action {
                    Action::CheckTrim => self.check_trim(),
                    Action::CallModel { iteration } => {
                        next_event = Some(self.call_model(iteration, &mut failure).await);
                    }
                    Action::ExecuteTools { count } => {
                        debug!("Executing {} tool calls", count);
                        next_event = Some(self.execute_tools().await);
                    }
                    Action::Finish(stop) => return self.finish(stop, failure.take()),
                }
            }

            match next_event {
                Some(e) => event = e,
                None => {
                    return TurnOutcome::BackendFailed {
                        message: format!("Agent loop stalled in state {:?}", state),
                    }
                }
            }
        }
    }

    fn finish(&mut self, stop: Stop, failure: Option<String>) -> TurnOutcome {
        match stop {
            Stop::Completed => {
                info!(
                    "Turn complete after {} total requests",
                    self.usage.requests
                );
                TurnOutcome::Completed {
                    text: self.final_text(),
                }
            }
            Stop::MaxIterations => {
                warn!("Max iterations ({}) reached", self.config.max_iterations);
                let max_iterations = self.config.max_iterations;
                self.emit(LoopEvent::IterationCapReached { max_iterations });
                TurnOutcome::MaxIterations
            }
            Stop::BackendFailed => TurnOutcome::BackendFailed {
                message: failure.unwrap_or_else(|| "unknown backend failure".to_string()),
            },
        }
    }
}
