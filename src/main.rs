//! Exec Relay CLI
//!
//! Entry point for the `exec-relay` command-line tool.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use exec_relay::agent;
use exec_relay::client::{RelayClient, RemoteError};
use exec_relay::config::{self, LogFormat, Overrides, RelayConfig, TransportKind};
use exec_relay::telemetry;
use serde_json::json;

#[derive(Parser)]
#[command(name = "exec-relay")]
#[command(about = "Relay commands between an execution controller and engine", version)]
struct Cli {
    /// Path to config file (default: .exec-relay.toml when present)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "relay_agent=debug"
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one relay session against the scripted engine
    Agent {
        /// Channel to serve the controller on
        #[arg(long, value_enum)]
        transport: Option<TransportKind>,

        /// Address to listen on for the tcp transport
        #[arg(long)]
        listen: Option<String>,
    },

    /// Send one command to a listening agent and print the outcome as JSON
    Send {
        /// Agent address
        #[arg(long)]
        connect: String,

        #[command(subcommand)]
        request: SendCommands,
    },
}

#[derive(Subcommand)]
enum SendCommands {
    /// Invoke a method
    Invoke { class: String, method: String },
    /// Read a variable
    Var { class: String, var: String },
    /// Append a path to the classpath
    Classpath { path: String },
    /// Interrupt the running invocation
    Stop,
    /// Close the engine
    Close,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match RelayConfig::resolve(cli.config.as_deref(), Path::new(config::DEFAULT_CONFIG_FILE)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let (transport, listen) = match &cli.command {
        Commands::Agent { transport, listen } => (*transport, listen.clone()),
        Commands::Send { .. } => (None, None),
    };
    config.apply(Overrides {
        transport,
        listen,
        log_filter: cli.log_filter,
        log_format: cli.log_format,
    });

    if let Err(e) = telemetry::initialise(&config.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match cli.command {
        Commands::Agent { .. } => run_agent(&config),
        Commands::Send { connect, request } => run_send(&connect, request),
    }
}

fn run_agent(config: &RelayConfig) -> ExitCode {
    match agent::run(config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Agent error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_send(connect: &str, request: SendCommands) -> ExitCode {
    let stream = match TcpStream::connect(connect) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to {}: {}", connect, e);
            return ExitCode::FAILURE;
        }
    };
    let input = match stream.try_clone() {
        Ok(s) => BufReader::new(s),
        Err(e) => {
            eprintln!("Failed to set up connection: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut client = RelayClient::new(input, BufWriter::new(stream));

    let outcome = match request {
        SendCommands::Invoke { class, method } => client.invoke(&class, &method).map(|v| json!(v)),
        SendCommands::Var { class, var } => client.var_value(&class, &var).map(|v| json!(v)),
        SendCommands::Classpath { path } => client.add_to_classpath(&path).map(|()| json!(null)),
        SendCommands::Stop => client.stop().map(|()| json!(null)),
        SendCommands::Close => client.close().map(|()| json!(null)),
    };

    let (report, code) = match outcome {
        Ok(result) => (json!({ "status": "SUCCESS", "result": result }), ExitCode::SUCCESS),
        Err(e) => (failure_report(&e), ExitCode::FAILURE),
    };
    println!("{}", report);
    code
}

fn failure_report(error: &RemoteError) -> serde_json::Value {
    let mut report = json!({ "status": error.status_name(), "message": error.to_string() });
    match error {
        RemoteError::User { stack, cause_class, .. } => {
            report["cause_class"] = json!(cause_class);
            report["stack"] = json!(stack);
        }
        RemoteError::Corralled { id, stack } => {
            report["id"] = json!(id);
            report["stack"] = json!(stack);
        }
        RemoteError::ClassInstall { installed, .. } => {
            report["installed"] = json!(installed);
        }
        _ => {}
    }
    report
}
