//! spine-submit - command-line front end for the Spine client
//!
//! Uploads an SCR document and waits for its processing result, or runs one
//! of the synchronous operations. Result bodies are written to stdout.

mod config;
mod logging;
mod shutdown;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use spine_client::{
    CallerIdentity, FlowState, RawBody, RemoteResponse, ReqwestTransport, SpineClient,
    SubmissionClient, Transport,
};
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::config::Config;
use crate::shutdown::SignalPause;

#[derive(Parser)]
#[command(name = "spine-submit", version)]
#[command(about = "Submit documents to the Spine and collect the results")]
struct Cli {
    /// Configuration file (defaults to ./spine.toml when present)
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an SCR document and poll until the result is ready
    Submit {
        #[command(flatten)]
        identity: IdentityArgs,
        /// Wait before the first poll, in milliseconds
        #[arg(long)]
        initial_wait_ms: Option<u64>,
        /// Polling budget, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// SOAP envelope to upload ('-' reads stdin)
        body: PathBuf,
    },
    /// Send ACS data and print the response whatever its status
    Acs {
        /// Request body ('-' reads stdin)
        body: PathBuf,
    },
    /// Query the SCR ID of a patient
    ScrId {
        /// Accredited System ID of the caller
        #[arg(long)]
        asid: String,
        /// QUPC_IN180000SM04 request ('-' reads stdin)
        body: PathBuf,
    },
    /// Send a FHIR alert
    Alert {
        #[command(flatten)]
        identity: IdentityArgs,
        /// FHIR JSON body ('-' reads stdin)
        body: PathBuf,
    },
}

/// Caller identity sent on every request of a flow
#[derive(Args)]
struct IdentityArgs {
    /// Accredited System ID of the caller
    #[arg(long)]
    asid: String,
    /// Identity (user) UUID
    #[arg(long)]
    identity: Option<String>,
    /// Session URID of the calling user role
    #[arg(long)]
    session_urid: Option<String>,
    /// Correlation id (generated when omitted)
    #[arg(long)]
    correlation_id: Option<String>,
    /// Request id (generated when omitted)
    #[arg(long)]
    request_id: Option<String>,
}

impl IdentityArgs {
    fn into_caller_identity(self) -> CallerIdentity {
        let mut identity = CallerIdentity::new(self.asid)
            .correlation_id(
                self.correlation_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
            )
            .request_id(self.request_id.unwrap_or_else(|| Uuid::new_v4().to_string()));
        if let Some(user) = self.identity {
            identity = identity.identity(user);
        }
        if let Some(session_urid) = self.session_urid {
            identity = identity.session_urid(session_urid);
        }
        identity
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    let _logging_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        spine_url = %config.spine.url,
        "Starting spine-submit"
    );

    let transport = Arc::new(
        ReqwestTransport::new(config.spine.request_timeout())
            .context("Failed to build HTTP client")?,
    );

    match cli.command {
        Commands::Submit {
            identity,
            initial_wait_ms,
            timeout_ms,
            body,
        } => {
            // Only a polling flow takes over SIGINT/SIGTERM; the single-shot
            // commands keep the default behaviour and stop on Ctrl-C.
            let client =
                SpineClient::with_pause(transport, config.spine.clone(), SignalPause::install())
                    .context("Failed to create Spine client")?;

            let identity = identity.into_caller_identity();
            let body = read_body(&body).await?;
            let initial_wait = initial_wait_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.spine.initial_wait());
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.spine.repeat_timeout());

            tracing::info!(
                correlation_id = identity.correlation_id.as_deref(),
                initial_wait_ms = initial_wait.as_millis() as u64,
                timeout_ms = timeout.as_millis() as u64,
                "Submitting SCR document"
            );

            match client
                .submit_and_poll(&RawBody, &body, &identity, initial_wait, timeout)
                .await
            {
                Ok(document) => {
                    println!("{document}");
                    Ok(())
                }
                Err(err) => {
                    tracing::error!(
                        state = ?FlowState::for_error(&err),
                        submitted = err.was_submitted(),
                        correlation_id = identity.correlation_id.as_deref(),
                        "SCR flow did not produce a result"
                    );
                    Err(err).context("SCR submission failed")
                }
            }
        }
        command => {
            let submission = SubmissionClient::new(transport, config.spine.clone())
                .context("Failed to create Spine client")?;
            run_single_shot(&submission, command).await
        }
    }
}

async fn run_single_shot<T: Transport>(
    submission: &SubmissionClient<T>,
    command: Commands,
) -> anyhow::Result<()> {
    let response = match command {
        Commands::Acs { body } => {
            let body = read_body(&body).await?;
            submission
                .send_acs_data(&body)
                .await
                .context("Failed to send ACS data")?
        }
        Commands::ScrId { asid, body } => {
            let body = read_body(&body).await?;
            submission
                .send_get_scr_id(&body, &asid)
                .await
                .context("SCR ID query failed")?
        }
        Commands::Alert { identity, body } => {
            let identity = identity.into_caller_identity();
            let body = read_body(&body).await?;
            submission
                .send_alert(&body, &identity)
                .await
                .context("Failed to send alert")?
        }
        Commands::Submit { .. } => anyhow::bail!("submit is not a single-shot command"),
    };
    print_response(&response);
    Ok(())
}

async fn read_body(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        tokio::io::stdin()
            .read_to_string(&mut body)
            .await
            .context("Failed to read request body from stdin")?;
        return Ok(body);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read request body from {}", path.display()))
}

fn print_response(response: &RemoteResponse) {
    tracing::info!(status = response.status, "Spine responded");
    if let Some(body) = &response.body {
        println!("{body}");
    }
}
