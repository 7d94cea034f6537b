use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use serde_json::{json, Value};
use service::auth::LoginInput;
use service::runtime::{open_session, SessionRuntime};
use service::SessionError;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "session", about = "Sign in to the auth API and manage the local session")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "CONFIG_PATH", default_value = configs::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Emit JSON logs on stderr.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SESSION_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session; `--silent` skips telling the server.
    Logout {
        #[arg(long)]
        silent: bool,
    },
    /// Print the stored session; exit code 1 when not logged in.
    Status,
    /// Print the current user profile.
    Whoami,
    /// Adopt an access token obtained elsewhere.
    SetToken {
        #[arg(long)]
        token: String,
        /// User profile as a JSON document.
        #[arg(long, default_value = "{}")]
        user: String,
    },
    /// Exchange a refresh token (default: the one kept from the last login) for a new session.
    Resume {
        #[arg(long, env = "SESSION_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: Option<String>,
    },
    /// Overwrite the stored token, user and status without contacting the server.
    Set {
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        status: bool,
    },
}

fn main() -> ExitCode {
    // load .env so RUST_LOG and the API settings can live next to the config
    dotenv().ok();
    let cli = Cli::parse();
    common::utils::logging::init_logging(cli.json);

    let run_id = Uuid::new_v4();
    info!(service = "session", event = "start", %run_id, version = env!("CARGO_PKG_VERSION"), "session cli starting");

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "session", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        match run(cli).await {
            Ok(code) => code,
            Err(e) => {
                error!(service = "session", event = "run_failed", %run_id, error = %e, "command failed");
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    })
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let cfg = configs::AppConfig::load_or_default(&cli.config)?;
    let SessionRuntime { api, store } = open_session(&cfg).await?;

    match cli.command {
        Command::Login { email, password } => {
            let resp = store.login(&LoginInput { email, password }).await?;
            print_json(&resp.user)?;
        }
        Command::Logout { silent } => match store.logout(silent).await {
            Ok(()) => {}
            Err(SessionError::Auth(e)) => {
                eprintln!("remote logout failed ({e}); local session cleared");
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Status => {
            let state = store.state();
            let logged_in = store.check_login();
            print_json(&json!({ "loggedIn": logged_in, "state": state }))?;
            if !logged_in {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Whoami => match store.user() {
            Some(user) if store.check_login() => print_json(&user)?,
            _ => {
                println!("not logged in");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::SetToken { token, user } => {
            let user = parse_user(&user)?;
            store.login_with_token(token, user).await?;
        }
        Command::Resume { refresh_token } => {
            let resp = api.refresh(refresh_token).await?;
            store.login_with_token(resp.access_token, resp.user.clone()).await?;
            print_json(&resp.user)?;
        }
        Command::Set { token, user, status } => {
            let user = user.as_deref().map(parse_user).transpose()?;
            store.change_local_login_data(token, user, status).await?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn parse_user(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("--user must be a JSON document: {e}"))
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
