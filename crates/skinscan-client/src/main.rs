use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use skinscan_client::account::{self, SignUpForm};
use skinscan_client::backend::BackendClient;
use skinscan_client::camera::SystemCamera;
use skinscan_client::capture::capture_or_pick;
use skinscan_client::config::ClientConfig;
use skinscan_client::error::ClientError;
use skinscan_client::image_file::ImageFile;
use skinscan_client::notice::{Notice, Operation};
use skinscan_client::scans::ScanService;
use skinscan_client::session::{Session, SessionEvent};

#[derive(Parser, Debug)]
#[command(name = "skinscan")]
#[command(about = "Scan a skin photo and keep a history of assessments")]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account.
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        /// Confirm that you are 18 or older.
        #[arg(long)]
        confirm_adult: bool,
    },
    /// Show the signed-in user.
    Whoami,
    /// Show the profile, or save name and age when both are given.
    Profile {
        #[arg(long, requires = "age")]
        name: Option<String>,
        #[arg(long, requires = "name")]
        age: Option<u32>,
    },
    /// Upload an image, analyze it, and save the result.
    Analyze { path: PathBuf },
    /// Take a photo with the camera, analyze it, and save the result.
    Capture {
        /// Image to analyze instead when the camera cannot be used.
        #[arg(long)]
        fallback: Option<PathBuf>,
    },
    /// List saved scans, newest first.
    History,
    /// Delete a saved scan.
    Delete { id: String },
}

impl Command {
    fn operation(&self) -> Operation {
        match self {
            Command::SignUp { .. } => Operation::SignUp,
            Command::Whoami => Operation::SignIn,
            Command::Profile { .. } => Operation::SaveProfile,
            Command::Analyze { .. } | Command::Capture { .. } => Operation::Analyze,
            Command::History => Operation::LoadHistory,
            Command::Delete { .. } => Operation::DeleteScan,
        }
    }
}

struct Failure {
    op: Operation,
    err: ClientError,
}

impl Failure {
    fn during(op: Operation) -> impl FnOnce(ClientError) -> Self {
        move |err| Self { op, err }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let config = ClientConfig::from_env()?;
    let backend = Arc::new(BackendClient::new(&config)?);

    let mut events = Box::pin(backend.events().subscribe());
    let logger = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                SessionEvent::SignedIn(session) => {
                    info!(user_id = %session.user.id, "session started")
                }
                SessionEvent::SignedOut => info!("session ended"),
            }
        }
    });

    let outcome = dispatch(args.cmd, &backend, &config).await;

    // Dropping the last client closes the event stream; wait for the logger
    // to write out what is still queued.
    drop(backend);
    if let Err(e) = logger.await {
        warn!(error = %e, "session event logger failed");
    }

    match outcome {
        Ok((notice, output)) => {
            eprintln!("{notice}");
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(Failure { op, err }) => {
            error!(error = %err, ?op, "command failed");
            let notice = err.notice(op);
            eprintln!("{}", serde_json::to_string(&notice)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn dispatch(
    cmd: Command,
    backend: &Arc<BackendClient>,
    config: &ClientConfig,
) -> Result<(Notice, Value), Failure> {
    let op = cmd.operation();
    let cmd = match cmd {
        Command::SignUp {
            email,
            password,
            full_name,
            confirm_adult,
        } => {
            let form = SignUpForm {
                email,
                password,
                full_name,
                confirmed_adult: confirm_adult,
            };
            let outcome = account::sign_up(backend, &form)
                .await
                .map_err(Failure::during(op))?;
            let output = json!({
                "user": outcome.user,
                "confirmed": outcome.session.is_some(),
            });
            return Ok((Notice::success(op), output));
        }
        other => other,
    };

    let session = sign_in(backend).await.map_err(Failure::during(Operation::SignIn))?;
    let result = run_signed_in(cmd, backend, config, &session)
        .await
        .map_err(Failure::during(op));

    if let Err(e) = backend.sign_out(session).await {
        warn!(error = %e, "sign-out failed");
    }
    result.map(|output| (Notice::success(op), output))
}

async fn run_signed_in(
    cmd: Command,
    backend: &Arc<BackendClient>,
    config: &ClientConfig,
    session: &Session,
) -> Result<Value, ClientError> {
    let output = match cmd {
        // Handled before sign-in.
        Command::SignUp { .. } => Value::Null,
        Command::Whoami => json!(backend.current_user(session).await?),
        Command::Profile {
            name: Some(name),
            age: Some(age),
        } => json!(account::complete_profile(backend, session, &name, age).await?),
        Command::Profile { .. } => json!({
            "profile": backend.get_profile(session).await?,
            "needs_details": account::needs_details(backend, session).await?,
        }),
        Command::Analyze { path } => {
            let image = ImageFile::from_path(&path)?;
            let service = ScanService::new(backend.clone(), config);
            json!(service.analyze(session, &image).await?)
        }
        Command::Capture { fallback } => {
            let acquired = capture_or_pick(&SystemCamera, fallback.as_deref())?;
            if let Some(notice) = &acquired.notice {
                eprintln!("{notice}");
            }
            let service = ScanService::new(backend.clone(), config);
            json!(service.analyze(session, &acquired.image).await?)
        }
        Command::History => {
            let service = ScanService::new(backend.clone(), config);
            json!(service.history(session).await?)
        }
        Command::Delete { id } => {
            let service = ScanService::new(backend.clone(), config);
            service.delete(session, &id).await?;
            json!({ "deleted": id })
        }
    };
    Ok(output)
}

async fn sign_in(backend: &BackendClient) -> Result<Session, ClientError> {
    let email = credential("SKINSCAN_EMAIL")?;
    let password = credential("SKINSCAN_PASSWORD")?;
    Ok(backend.sign_in(&email, &password).await?)
}

fn credential(key: &str) -> Result<String, ClientError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ClientError::Config(format!("{key} environment variable is required")))
}
