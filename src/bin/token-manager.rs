use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use token_manager::app::AppContext;
use token_manager::session::UserProfile;
use token_manager::token::inspector::{decode_claims, get_time_until_expiration, get_token_expiration, is_token_expired};
use token_manager::utils::config_loader;
use token_manager::utils::logging::{self, LogLevel};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "token-manager.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Print Prometheus metrics to stdout after the command
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the stored session and its token's expiry
    Status,
    /// Print a valid access token, refreshing it if needed
    Token,
    /// Refresh if needed and fail loudly when that is impossible
    Refresh,
    /// Store credentials obtained from a login response
    Login {
        #[arg(long)]
        token: String,
        /// User profile as JSON
        #[arg(long)]
        user: Option<String>,
        /// Refresh cookie from the login response, e.g. `refreshToken=...`
        #[arg(long, env = "REFRESH_COOKIE")]
        refresh_cookie: Option<String>,
    },
    /// Forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Wire components
    // -------------------------------

    let app = AppContext::from_config(&service_config)?;
    let session = app.restore().await?;
    info!(authenticated = session.is_authenticated, "session loaded");

    // -------------------------------
    // 3. Run command
    // -------------------------------

    match args.command {
        Command::Status => {
            let buffer_minutes = service_config.settings.token.buffer_minutes;
            let status = match session.token.as_deref() {
                Some(token) => json!({
                    "authenticated": session.is_authenticated,
                    "claims": decode_claims(token).ok(),
                    "expires_at": get_token_expiration(token).map(|exp| exp.to_rfc3339()),
                    "minutes_left": get_time_until_expiration(token),
                    "needs_refresh": is_token_expired(token, buffer_minutes),
                    "user": session.user,
                }),
                None => json!({ "authenticated": false }),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Token => match app.coordinator.get_valid_access_token().await {
            Some(token) => println!("{}", token),
            None => return Err(anyhow!("not authenticated")),
        },
        Command::Refresh => match app.coordinator.refresh_token_if_needed().await? {
            Some(token) => println!("{}", token),
            None => return Err(anyhow!("no session to refresh")),
        },
        Command::Login { token, user, refresh_cookie } => {
            let user = user
                .map(|raw| serde_json::from_str::<UserProfile>(&raw))
                .transpose()
                .map_err(|e| anyhow!("invalid --user JSON: {}", e))?;
            app.login(&token, user, refresh_cookie.as_deref()).await?;
        }
        Command::Logout => app.session.logout().await?,
    }

    // a refresh may have rotated the cookie
    app.save_cookies().await?;

    if args.print_metrics {
        print!("{}", app.metrics.render()?);
    }

    Ok(())
}
