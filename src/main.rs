use std::path::PathBuf;

use clap::{Parser, Subcommand};
use visa_portal::app::Portal;
use visa_portal::config::{ConfigError, DotenvStatus, PortalConfig};
use visa_portal::error::{ApiError, AuthError, NavigationError};
use visa_portal::nav::{Location, Navigator, RouteName};
use visa_portal::net::types::{Credentials, Registration};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup failed: {0}")]
    Setup(#[from] ApiError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("email is not verified")]
    Unverified,
}

#[derive(Parser, Debug)]
#[command(name = "visa-portal", about = "Visa platform session client")]
struct Cli {
    /// Backend REST base URL (overrides `VISA_API_BASE_URL`).
    #[arg(long)]
    api_url: Option<String>,

    /// Session storage file (overrides `VISA_SESSION_FILE`).
    #[arg(long)]
    session_file: Option<PathBuf>,

    #[arg(long, env = "FIREBASE_API_KEY", hide_env_values = true)]
    firebase_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with email and password, or through an OAuth provider.
    Login {
        #[arg(long, required_unless_present = "provider")]
        email: Option<String>,
        #[arg(long, env = "VISA_PASSWORD", hide_env_values = true, required_unless_present = "provider")]
        password: Option<String>,
        /// google, facebook, microsoft, or apple.
        #[arg(long)]
        provider: Option<String>,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "VISA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Show the stored session.
    Whoami,
    /// Navigate to a route name (`admin.users`) or path (`/admin/users`).
    Navigate {
        target: String,
        /// Path parameters as `key=value` when navigating by name.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List every route with its access rules.
    Routes,
    ForgotPassword {
        email: String,
    },
    ResetPassword {
        #[arg(long)]
        code: String,
        #[arg(long, env = "VISA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Refresh the email verification flag, signing in to the identity
    /// provider first when `--email` is given.
    CheckVerified {
        #[arg(long, requires = "password")]
        email: Option<String>,
        #[arg(long, env = "VISA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Resend the verification email for an identity provider account.
    ResendVerification {
        #[arg(long)]
        email: String,
        #[arg(long, env = "VISA_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = DotenvStatus::from(dotenvy::dotenv());
    tracing_subscriber::fmt::init();
    dotenv.log();

    let cli = Cli::parse();
    let mut config = PortalConfig::from_env()?;
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url)?;
    }
    if let Some(path) = cli.session_file {
        config.session_file = path;
    }
    if cli.firebase_api_key.is_some() {
        config.firebase_api_key = cli.firebase_api_key;
    }

    let portal = Portal::from_config(config)?;
    run(&portal, cli.command).await?;
    print_location(&portal);
    Ok(())
}

async fn run(portal: &Portal, command: Command) -> Result<(), CliError> {
    let store = portal.store();
    match command {
        Command::Login { provider: Some(provider), .. } => {
            store.login_with_oauth(&provider).await?;
        }
        Command::Login { email, password, provider: None } => {
            let credentials = Credentials::new(email.unwrap_or_default(), password.unwrap_or_default());
            store.login(&credentials).await?;
        }
        Command::Register { name, email, password } => {
            store.register(&Registration::new(name, email, password)).await?;
        }
        Command::Logout => store.logout().await,
        Command::Whoami => run_whoami(portal),
        Command::Navigate { target, params } => {
            let reached = if target.starts_with('/') {
                portal.router().push_path(&target)?
            } else {
                let location = params
                    .into_iter()
                    .fold(Location::named(RouteName::new(target)), |loc, (k, v)| loc.with_param(k, v));
                portal.router().push(location)?
            };
            tracing::debug!(route = %reached.name, "navigated");
        }
        Command::Routes => run_routes(portal),
        Command::ForgotPassword { email } => store.send_password_reset(&email).await?,
        Command::ResetPassword { code, password } => {
            let email = store.verify_reset_code(&code).await?;
            println!("resetting password for {email}");
            store.confirm_password_reset(&code, &password).await?;
        }
        Command::CheckVerified { email, password } => {
            if let (Some(email), Some(password)) = (email, password) {
                store.provider_sign_in(&Credentials::new(email, password)).await?;
            }
            if !store.check_email_verified().await {
                return Err(CliError::Unverified);
            }
        }
        Command::ResendVerification { email, password } => {
            store.provider_sign_in(&Credentials::new(email, password)).await?;
            store.resend_verification_email().await?;
        }
    }
    Ok(())
}

fn run_whoami(portal: &Portal) {
    let session = portal.session().snapshot();
    match session.identity() {
        Some(user) if session.is_authenticated() => {
            let role = user.role.map_or("unknown", |r| r.as_str());
            println!("{} <{}> role={role} verified={}", user.name, user.email, session.email_verified());
        }
        _ => println!("not signed in"),
    }
}

fn run_routes(portal: &Portal) {
    for record in portal.router().table().iter() {
        let access = match (record.meta.requires_auth, &record.meta.roles) {
            (false, _) => "public".to_owned(),
            (true, None) => "signed-in".to_owned(),
            (true, Some(roles)) => roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(","),
        };
        println!("{:<36} {:<44} {access}", record.name.as_str(), record.path);
    }
}

fn print_location(portal: &Portal) {
    let current = portal.router().current();
    let path = portal.router().current_path().unwrap_or_default();
    println!("location: {} {path}", current.name);
}
