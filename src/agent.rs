//! Local agent sessions.
//!
//! Runs one relay session against a [`ScriptedEngine`] over stdio or the
//! first TCP connection accepted on the configured address.

use std::io::{self, BufReader, BufWriter};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;

use relay_agent::{ExecutionEngine, Forwarder, Script, ScriptedEngine, TerminationCause};
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::config::{RelayConfig, ScriptEntry, ScriptKind, TransportKind};

/// Errors that prevent a session from starting.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to accept controller connection: {0}")]
    Accept(#[source] io::Error),

    #[error("failed to install interrupt handler: {0}")]
    Interrupt(#[from] ctrlc::Error),
}

/// Build a scripted engine from `[[script]]` entries.
pub fn build_engine(scripts: &[ScriptEntry]) -> ScriptedEngine {
    let engine = ScriptedEngine::new();
    for entry in scripts {
        let script = if entry.block {
            Script::BlockUntilStopped
        } else {
            Script::Result(entry.result.clone())
        };
        match entry.kind {
            ScriptKind::Invoke => engine.script_invoke(&entry.class, &entry.member, script),
            ScriptKind::Var => engine.script_var(&entry.class, &entry.member, script),
        }
    }
    engine
}

/// Run one session as configured.
///
/// Ctrl-C interrupts a running invocation through the engine's `stop`; when
/// nothing is running it exits the process.
pub fn run(config: &RelayConfig) -> Result<TerminationCause, AgentError> {
    let engine = Arc::new(build_engine(&config.scripts));
    install_interrupt(Arc::clone(&engine))?;

    let session = Uuid::new_v4();
    let span = info_span!("session", id = %session, transport = %config.agent.transport);
    let _entered = span.enter();

    let cause = match config.agent.transport {
        TransportKind::Stdio => serve_stdio(engine),
        TransportKind::Tcp => {
            let listener = TcpListener::bind(&config.agent.listen).map_err(|source| AgentError::Bind {
                addr: config.agent.listen.clone(),
                source,
            })?;
            serve_listener(engine, &listener)?
        }
    };
    info!(?cause, "session ended");
    Ok(cause)
}

/// Relay frames from stdin, responses to stdout.
pub fn serve_stdio<E: ExecutionEngine + ?Sized>(engine: Arc<E>) -> TerminationCause {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Forwarder::new(engine, stdin.lock(), BufWriter::new(stdout.lock())).run()
}

/// Accept one controller on `listener` and relay for it.
pub fn serve_listener<E: ExecutionEngine + ?Sized>(
    engine: Arc<E>,
    listener: &TcpListener,
) -> Result<TerminationCause, AgentError> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "waiting for controller");
    }
    let (stream, peer) = listener.accept().map_err(AgentError::Accept)?;
    info!(%peer, "controller connected");
    serve_stream(engine, stream).map_err(AgentError::Accept)
}

/// Relay over an established connection.
pub fn serve_stream<E: ExecutionEngine + ?Sized>(engine: Arc<E>, stream: TcpStream) -> io::Result<TerminationCause> {
    stream.set_nodelay(true)?;
    let input = BufReader::new(stream.try_clone()?);
    let output = BufWriter::new(stream);
    Ok(Forwarder::new(engine, input, output).run())
}

fn install_interrupt(engine: Arc<ScriptedEngine>) -> Result<(), AgentError> {
    ctrlc::set_handler(move || {
        if !engine.is_executing() {
            std::process::exit(130);
        }
        if let Err(error) = engine.stop() {
            warn!(%error, "stop on interrupt failed");
        }
    })?;
    Ok(())
}
