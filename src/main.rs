//! Front Desk - clinic front-desk portal server
//!
//! Serves the staff, patient and appointment API and manages its database.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use frontdesk_api::{ApiServer, ApiServerConfig, MIN_JWT_SECRET_LEN};
use frontdesk_auth::{
    AuthService, HashParams, PasswordHasher, TokenService, MIN_PASSWORD_LENGTH,
};
use frontdesk_db::SeaOrmCredentialStore;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Front Desk - patient registration and appointment booking for clinic staff
#[derive(Parser, Debug)]
#[command(name = "frontdesk")]
#[command(about = "Front Desk - patient registration and appointment booking for clinic staff")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Database URL (sqlite://... or postgres://...)
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "sqlite://frontdesk.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

/// Argon2id work factor flags
#[derive(Args, Debug, Clone)]
struct HashArgs {
    /// Argon2id memory cost in KiB
    #[arg(long, env = "FRONTDESK_HASH_MEMORY_KIB", default_value_t = HashParams::default().memory_kib)]
    hash_memory_kib: u32,

    /// Argon2id iterations
    #[arg(long, env = "FRONTDESK_HASH_ITERATIONS", default_value_t = HashParams::default().iterations)]
    hash_iterations: u32,

    /// Argon2id parallelism
    #[arg(long, env = "FRONTDESK_HASH_PARALLELISM", default_value_t = HashParams::default().parallelism)]
    hash_parallelism: u32,
}

impl HashArgs {
    fn params(&self) -> HashParams {
        HashParams {
            memory_kib: self.hash_memory_kib,
            iterations: self.hash_iterations,
            parallelism: self.hash_parallelism,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run migrations and serve the HTTP API
    #[command(long_about = r#"
Connect to the database, apply pending migrations and serve the HTTP API.

EXAMPLES:
  # Local SQLite database, self-registration enabled
  frontdesk serve --jwt-secret "$JWT_SECRET" --allow-signup

  # PostgreSQL behind a reverse proxy
  frontdesk serve --database-url postgres://frontdesk@db/frontdesk \
    --bind 0.0.0.0:8080 --jwt-secret "$JWT_SECRET"

ENVIRONMENT VARIABLES:
  DATABASE_URL               Database connection string
  FRONTDESK_BIND             Address to bind the API server
  JWT_SECRET                 Secret for signing session tokens
  FRONTDESK_REQUEST_TIMEOUT  Deadline for login, registration and booking (seconds)
  FRONTDESK_ALLOW_SIGNUP     Accept self-registration
  FRONTDESK_HASH_*           Argon2id work factor
    "#)]
    Serve {
        /// Address to bind the API server
        #[arg(long, env = "FRONTDESK_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Secret for signing session tokens (at least 32 bytes)
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,

        /// Deadline in seconds for login, registration and booking
        #[arg(long, env = "FRONTDESK_REQUEST_TIMEOUT", default_value = "10")]
        request_timeout_secs: u64,

        /// Accept new accounts on /api/auth/register
        #[arg(long, env = "FRONTDESK_ALLOW_SIGNUP")]
        allow_signup: bool,

        /// Allowed CORS origins (comma separated); localhost origins when unset
        #[arg(long, env = "FRONTDESK_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Option<Vec<String>>,

        #[command(flatten)]
        hash: HashArgs,
    },

    /// Run database migrations and exit
    Migrate,

    /// Create a staff account
    CreateUser {
        /// Login email
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// "front-desk" or "clinician"
        #[arg(long)]
        role: String,

        /// Initial password
        #[arg(long, env = "FRONTDESK_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[command(flatten)]
        hash: HashArgs,
    },

    /// Issue a password-reset token and print it to stdout
    #[command(long_about = r#"
Issue a one-hour password-reset token for an active account and print it to
stdout. The HTTP reset endpoint never returns tokens; staff hand this one to
the account holder over a trusted channel.

The secret must match the one the server runs with.

EXAMPLES:
  frontdesk reset-token --email desk@clinic.example --jwt-secret "$JWT_SECRET"
    "#)]
    ResetToken {
        /// Login email of the account
        #[arg(long)]
        email: String,

        /// Secret the server signs tokens with
        #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
        jwt_secret: String,
    },
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn open_database(database_url: &str) -> Result<frontdesk_db::DatabaseConnection> {
    let db = frontdesk_db::connect(database_url)
        .await
        .context("Failed to connect to database")?;
    frontdesk_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            bind,
            jwt_secret,
            request_timeout_secs,
            allow_signup,
            cors_origins,
            hash,
        } => {
            info!("Front Desk starting...");

            if allow_signup {
                warn!("Self-registration is enabled");
            }

            let db = open_database(&cli.database_url).await?;

            let config = ApiServerConfig {
                bind_addr: bind,
                enable_cors: true,
                cors_origins,
                jwt_secret,
                allow_signup,
                request_timeout: Duration::from_secs(request_timeout_secs),
                hash_params: hash.params(),
                ..Default::default()
            };
            let server = ApiServer::new(config, db).context("Invalid server configuration")?;

            tokio::select! {
                result = server.start() => {
                    if let Err(e) = result {
                        error!("API server error: {:#}", e);
                        return Err(e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                }
            }

            info!("Front Desk stopped");
            Ok(())
        }

        Commands::Migrate => {
            open_database(&cli.database_url).await?;
            info!("Database is up to date");
            Ok(())
        }

        Commands::CreateUser {
            email,
            name,
            role,
            password,
            hash,
        } => {
            if password.chars().count() < MIN_PASSWORD_LENGTH {
                anyhow::bail!(
                    "Password must be at least {} characters",
                    MIN_PASSWORD_LENGTH
                );
            }

            let db = open_database(&cli.database_url).await?;

            // Only the hasher is exercised here; the signing key is never used.
            let auth = AuthService::new(
                Arc::new(SeaOrmCredentialStore::new(db)),
                PasswordHasher::new(hash.params()).context("Invalid password hashing parameters")?,
                Arc::new(TokenService::new(b"")),
            );

            let profile = auth
                .register(&email, &password, &name, &role, Duration::from_secs(30))
                .await
                .context("Failed to create user")?;

            info!(
                "Created {} account {} (id {})",
                profile.role, profile.email, profile.id
            );
            Ok(())
        }

        Commands::ResetToken { email, jwt_secret } => {
            if jwt_secret.len() < MIN_JWT_SECRET_LEN {
                anyhow::bail!("JWT secret must be at least {} bytes", MIN_JWT_SECRET_LEN);
            }

            let db = open_database(&cli.database_url).await?;

            // Nothing is hashed here; default parameters are never exercised.
            let auth = AuthService::new(
                Arc::new(SeaOrmCredentialStore::new(db)),
                PasswordHasher::new(HashParams::default())
                    .context("Invalid password hashing parameters")?,
                Arc::new(TokenService::new(jwt_secret.as_bytes())),
            );

            let Some(issued) = auth
                .reset_password(&email)
                .await
                .context("Failed to issue reset token")?
            else {
                anyhow::bail!("No active account for {}", email);
            };

            info!(expires_at = %issued.expires_at, "Issued reset token for {}", email);
            println!("{}", issued.token);
            Ok(())
        }
    }
}
