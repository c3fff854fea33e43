//! Relay loop.
//!
//! Drives repeated decode → dispatch → encode cycles over one channel and
//! owns the decision to keep going. The loop is single-threaded and
//! blocking: a command is fully resolved and its response flushed before the
//! next one is read.

use std::io::{Read, Write};
use std::sync::Arc;

use relay_protocol::{CodecError, Command, FrameReader, FrameWriter};
use tracing::{debug, info};

use crate::dispatcher::{self, Outcome};
use crate::encoder;
use crate::engine::{EngineError, ExecutionEngine};

/// Why a relay session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// The engine reported itself unusable, or a frame had a bad prefix.
    EngineTerminated,
    /// A failure the engine could not classify.
    Unclassified,
    /// The channel failed while reading or writing; the peer is gone.
    Transport,
}

/// Lifecycle of a [`Forwarder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Running,
    Terminated(TerminationCause),
}

/// Forwards commands from `R` to an engine and responses back to `W`.
///
/// Bound to one engine and one channel for a single session. Once
/// terminated it performs no further reads or writes.
pub struct Forwarder<E: ?Sized, R, W> {
    engine: Arc<E>,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    state: RelayState,
}

impl<E, R, W> Forwarder<E, R, W>
where
    E: ExecutionEngine + ?Sized,
    R: Read,
    W: Write,
{
    /// Create a forwarder over the given channel halves.
    pub fn new(engine: Arc<E>, input: R, output: W) -> Self {
        Self {
            engine,
            reader: FrameReader::new(input),
            writer: FrameWriter::new(output),
            state: RelayState::Running,
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Process one command and return the resulting state.
    ///
    /// Does nothing once the forwarder has terminated.
    pub fn step(&mut self) -> RelayState {
        if self.state != RelayState::Running {
            return self.state;
        }
        let ended = match self.process_command() {
            Ok(None) => return self.state,
            Ok(Some(cause)) => cause,
            Err(error) => {
                debug!(%error, "channel failed");
                TerminationCause::Transport
            }
        };
        info!(cause = ?ended, "relay loop terminated");
        self.state = RelayState::Terminated(ended);
        self.state
    }

    /// Relay commands until the session ends.
    pub fn run(mut self) -> TerminationCause {
        loop {
            if let RelayState::Terminated(cause) = self.step() {
                return cause;
            }
        }
    }

    /// One decode → dispatch → encode cycle.
    ///
    /// `Err` is a channel failure: no further response can be sent.
    fn process_command(&mut self) -> Result<Option<TerminationCause>, CodecError> {
        let outcome = match Command::read(&mut self.reader) {
            Ok(command) => {
                debug!(tag = command.tag().as_str(), "dispatching command");
                dispatcher::dispatch(self.engine.as_ref(), command)
            }
            Err(error) if error.is_transport() => return Err(error),
            Err(error) => Err(dispatcher::decode_failure(error)),
        };

        let ended = termination_cause(&outcome);
        if let Some(response) = encoder::response_for(outcome) {
            response.write_to(&mut self.writer)?;
        }
        Ok(ended)
    }
}

fn termination_cause(outcome: &Outcome) -> Option<TerminationCause> {
    match outcome {
        Err(EngineError::Terminated { .. }) => Some(TerminationCause::EngineTerminated),
        Err(EngineError::Unclassified { .. }) => Some(TerminationCause::Unclassified),
        _ => None,
    }
}
