//! # fncall CLI Entry Point
//!
//! One-shot invocation of a backend function from the shell, with the same
//! retry, timeout and error handling an application gets from the client
//! library.
//!
//! ## Usage
//!
//! ```bash
//! # Anonymous call (outputs raw JSON)
//! fncall call https://proj.supabase.co/functions/v1 rag-search -a '{"query": "x"}' --anon-key KEY
//!
//! # Call as a signed-in user
//! fncall call https://proj.supabase.co/functions/v1 export-user-data --access-token TOKEN
//!
//! # Tighter limits
//! fncall call http://127.0.0.1:54321/functions/v1 generate-podcast --max-retries 1 --timeout-ms 5000
//! ```
//!
//! On failure the error is printed to stderr as `error[CODE]: message` and the
//! process exits with status 1. Logs go to stderr, filtered by `RUST_LOG`
//! (default `warn`).

use anyhow::Result;
use argh::FromArgs;
use fncall_client::{ApiError, CancellationToken, InvocationRequest, Invoker};
use fncall_common::auth::{NoSession, Session, SessionProvider, StaticSessionProvider};
use fncall_common::config::{ENV_ANON_KEY, ENV_BASE_URL, ENV_MAX_RETRIES, ENV_TIMEOUT_MS};
use fncall_common::{AuthMode, ClientConfig};
use std::process::ExitCode;
use std::sync::Arc;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// fncall - resilient backend function invocation
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Call(CallArgs),
}

/// Arguments for a single function call.
///
/// Anything not given on the command line falls back to the `FNCALL_*`
/// environment variables, then to the library defaults.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a backend function and print its JSON result
struct CallArgs {
    /// functions base URL, e.g. https://proj.supabase.co/functions/v1
    ///
    /// Must include the http:// or https:// prefix.
    #[argh(positional)]
    base_url: String,

    /// name of the function to call
    #[argh(positional)]
    function: String,

    /// request body as JSON (default: {})
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,

    /// anonymous service key (default: $FNCALL_ANON_KEY); not needed with --access-token
    #[argh(option, long = "anon-key")]
    anon_key: Option<String>,

    /// access token of a signed-in user; switches to authenticated mode
    #[argh(option, long = "access-token")]
    access_token: Option<String>,

    /// total number of attempts (default: $FNCALL_MAX_RETRIES or 3)
    #[argh(option, long = "max-retries")]
    max_retries: Option<u32>,

    /// per-attempt timeout in milliseconds (default: $FNCALL_TIMEOUT_MS or 30000)
    #[argh(option, long = "timeout-ms")]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli: Cli = argh::from_env();

    // stdout carries only the JSON result, so logs go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Call(args) => run_call(args).await,
    }
}

async fn run_call(args: CallArgs) -> Result<ExitCode> {
    let config = config_from_args(&args, |name| std::env::var(name).ok())?;

    let body: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;

    let mode = if args.access_token.is_some() {
        AuthMode::Session
    } else {
        AuthMode::Anonymous
    };
    let sessions: Arc<dyn SessionProvider> = match &args.access_token {
        Some(token) => Arc::new(StaticSessionProvider::new(Session::new(token.as_str()))),
        None => Arc::new(NoSession),
    };

    let request = match InvocationRequest::new(args.function.as_str(), &body) {
        Ok(request) => request.with_auth_mode(mode),
        Err(e) => {
            eprintln!("{}", render_error(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::debug!("Calling {} at {} ({:?})", args.function, config.base_url(), mode);
    let invoker = Invoker::new(config, sessions);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match invoker.invoke_with_cancel(&request, &cancel).await {
        Ok(result) => {
            // Output raw JSON to stdout
            println!("{}", serde_json::to_string(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", render_error(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Builds the client configuration, command-line values taking precedence
/// over `lookup`.
///
/// Session calls never send the anonymous key, so with `--access-token` and
/// no key configured the token stands in for it.
fn config_from_args<F>(args: &CallArgs, lookup: F) -> Result<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = ClientConfig::from_lookup(|name| match name {
        ENV_BASE_URL => Some(args.base_url.clone()),
        ENV_ANON_KEY => args
            .anon_key
            .clone()
            .or_else(|| lookup(name))
            .or_else(|| args.access_token.clone()),
        ENV_MAX_RETRIES => args
            .max_retries
            .map(|n| n.to_string())
            .or_else(|| lookup(name)),
        ENV_TIMEOUT_MS => args
            .timeout_ms
            .map(|ms| ms.to_string())
            .or_else(|| lookup(name)),
        _ => lookup(name),
    })?;
    Ok(config)
}

fn render_error(error: &ApiError) -> String {
    if error.retryable {
        format!("error[{}]: {} (retryable)", error.code, error.message)
    } else {
        format!("error[{}]: {}", error.code, error.message)
    }
}
