//! Pure state machine for one user turn
//!
//! No I/O here. The driver in [`crate::agent_loop`] feeds events in and
//! performs the returned actions; invalid transitions land in
//! [`State::Failed`] instead of panicking.

/// Why a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The model answered without requesting tools
    Completed,
    /// The iteration cap was hit while the model kept calling tools
    MaxIterations,
    /// The inference call failed
    BackendFailed,
}

/// Turn state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Between turns
    AwaitingUserInput,
    /// Waiting on model call number `iteration` (1-based)
    RequestingModel { iteration: usize },
    /// Running the `pending` tool calls from model call `iteration`
    ExecutingTools { iteration: usize, pending: usize },
    /// Turn over
    Done(Stop),
    /// An event arrived that makes no sense in the current state
    Failed { error: String },
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A user turn was appended
    UserInput,
    /// The model replied with `tool_calls` tool calls (possibly zero)
    ModelResponded { tool_calls: usize },
    /// The inference call failed
    BackendFailed,
    /// All pending tool calls have results
    ToolsFinished,
}

/// Side effects for the driver to perform, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run the context manager's trim check
    CheckTrim,
    /// Send the transcript to the model
    CallModel { iteration: usize },
    /// Dispatch every tool call of the last model turn
    ExecuteTools { count: usize },
    /// End the turn
    Finish(Stop),
}

/// Pure transition function.
///
/// `max_iterations` bounds the number of model calls per user turn.
pub fn transition(state: State, event: Event, max_iterations: usize) -> (State, Vec<Action>) {
    match (state, event) {
        (State::AwaitingUserInput | State::Done(_), Event::UserInput) => (
            State::RequestingModel { iteration: 1 },
            vec![Action::CheckTrim, Action::CallModel { iteration: 1 }],
        ),

        (State::RequestingModel { .. }, Event::ModelResponded { tool_calls: 0 }) => (
            State::Done(Stop::Completed),
            vec![Action::CheckTrim, Action::Finish(Stop::Completed)],
        ),

        (State::RequestingModel { iteration }, Event::ModelResponded { tool_calls }) => (
            State::ExecutingTools {
                iteration,
                pending: tool_calls,
            },
            vec![
                Action::CheckTrim,
                Action::ExecuteTools { count: tool_calls },
            ],
        ),

        (State::RequestingModel { .. }, Event::BackendFailed) => (
            State::Done(Stop::BackendFailed),
            vec![Action::Finish(Stop::BackendFailed)],
        ),

        (State::ExecutingTools { iteration, .. }, Event::ToolsFinished) => {
            if iteration >= max_iterations {
                (
                    State::Done(Stop::MaxIterations),
                    vec![Action::CheckTrim, Action::Finish(Stop::MaxIterations)],
                )
            } else {
                let next = iteration + 1;
                (
                    State::RequestingModel { iteration: next },
                    vec![Action::CheckTrim, Action::CallModel { iteration: next }],
                )
            }
        }

        (state, event) => (
            State::Failed {
                error: format!("Invalid transition: {:?} on {:?}", event, state),
            },
            vec![],
        ),
    }
}
