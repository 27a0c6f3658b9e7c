pub mod core;
pub mod token;
pub mod types;
pub mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::error::{AuthError, CliError, ValidationError};
use crate::core::{config, state::AppState};
use crate::utils::validate::{LoginForm, SignupForm, format_phone_number};

#[derive(Debug, Parser)]
#[command(name = "jikjik", version, about = "Log in to and sign up for the jikjik API")]
struct Cli {
    /// TOML config file. Defaults to ./jikjik.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in with a login id or phone number.
    Login {
        login_id_or_phone: String,
        #[arg(long, env = "JIKJIK_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep the user profile for the next start.
        #[arg(long)]
        remember: bool,
    },
    /// Submit a company sign-up.
    Signup {
        #[arg(long)]
        company: String,
        #[arg(long)]
        manager: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long, env = "JIKJIK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, env = "JIKJIK_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: String,
        #[arg(long)]
        agree_terms: bool,
        /// Image file sent as the signature.
        #[arg(long)]
        signature: Option<PathBuf>,
    },
    /// Exchange the stored refresh token for a new pair.
    Refresh,
    Logout,
    /// Show the signed-in user, if any.
    Status,
    /// Print the headers an authenticated request would carry.
    Headers,
}

pub async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    let args = config::load(cli.config.as_deref())?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&args.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let state = AppState::new(&args).await?;

    tracing::debug!("Using API at {}", state.credentials.client().base_url());

    execute(&state, cli.command).await
}

async fn execute(state: &AppState, command: Command) -> Result<(), CliError> {
    match command {
        Command::Login {
            login_id_or_phone,
            password,
            remember,
        } => {
            let form = LoginForm {
                login_id_or_phone,
                password,
                remember,
            };

            match state.submit_login(&form).await {
                Ok(profile) => {
                    println!("Logged in as {} ({})", profile.id, profile.role);
                    Ok(())
                }
                Err(AuthError::Validation(ValidationError::TooManyAttempts)) => {
                    if let Some(remaining) = state
                        .limiter
                        .remaining_lockout(form.login_id_or_phone.trim())
                    {
                        let minutes = (remaining.num_seconds() + 59) / 60;
                        eprintln!("Locked out for about {} more minute(s).", minutes);
                    }
                    Err(AuthError::from(ValidationError::TooManyAttempts).into())
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Signup {
            company,
            manager,
            email,
            phone,
            password,
            confirm_password,
            agree_terms,
            signature,
        } => {
            let signature_image = match signature {
                Some(path) => Some(tokio::fs::read(&path).await?),
                None => None,
            };

            let form = SignupForm {
                company_name: company,
                manager_name: manager,
                email,
                password,
                confirm_password,
                phone,
                agree_terms,
            };

            state.submit_signup(&form, signature_image).await?;

            println!(
                "Sign-up received for {}. We will contact you after review.",
                format_phone_number(&form.phone)
            );
            Ok(())
        }
        Command::Refresh => {
            if !state.credentials.refresh().await {
                return Err(AuthError::Unauthenticated.into());
            }

            println!("Tokens refreshed");
            Ok(())
        }
        Command::Logout => {
            state.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Status => {
            match state.load_user_session() {
                Some(profile) => {
                    println!("Logged in as {} ({})", profile.id, profile.role);
                    println!("{} <{}>, {}", profile.name, profile.email, profile.company);
                    if let Some(login_time) = profile.login_time {
                        println!("Since {}", login_time.to_rfc3339());
                    }
                }
                None => println!("Not logged in"),
            }
            Ok(())
        }
        Command::Headers => {
            let headers = state.credentials.auth_headers()?;

            for (name, value) in headers.iter() {
                println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            Ok(())
        }
    }
}
