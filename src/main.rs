//! chirpy-auth - operator tooling for Chirpy credentials and sessions

use std::sync::Arc;

use clap::Parser;
use hyper::header::{HeaderValue, AUTHORIZATION};
use hyper::HeaderMap;
use tracing::error;

use chirpy_auth::{
    auth::{
        hash_password, make_refresh_token, verify_password, AccessTokenIssuer, SessionService,
    },
    config::{Args, Command},
    db::{MongoClient, MongoStore},
    logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    logging::init(&args.log_level);

    // Commands that never touch tokens don't need a secret
    match &args.command {
        Command::HashPassword { password } => {
            println!("{}", hash_password(password)?);
            return Ok(());
        }
        Command::VerifyPassword { password, hash } => {
            let matches = verify_password(password, hash);
            println!("{}", matches);
            std::process::exit(if matches { 0 } else { 1 });
        }
        Command::NewRefreshToken => {
            println!("{}", make_refresh_token());
            return Ok(());
        }
        _ => {}
    }

    let config = match args.auth_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match &args.command {
        Command::IssueToken {
            user_id,
            ttl_seconds,
        } => {
            let issuer = AccessTokenIssuer::hs256(config.jwt_secret());
            let ttl = ttl_seconds.unwrap_or(config.access_token_ttl_seconds());
            println!("{}", issuer.issue(user_id, ttl)?);
        }
        Command::ValidateToken { token } => {
            let issuer = AccessTokenIssuer::hs256(config.jwt_secret());
            match issuer.validate(token) {
                Ok(user_id) => println!("{}", user_id),
                Err(kind) => {
                    eprintln!("{}", kind);
                    std::process::exit(1);
                }
            }
        }
        Command::Register { email, password } => {
            let service = connect(&args, &config).await?;
            let user = service.register(email, password).await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        Command::Login { email, password } => {
            let service = connect(&args, &config).await?;
            let outcome = service.login(email, password).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "id": outcome.user.id,
                    "email": outcome.user.email,
                    "createdAt": outcome.user.created_at,
                    "updatedAt": outcome.user.updated_at,
                    "isChirpyRed": outcome.user.is_chirpy_red,
                    "token": outcome.access_token,
                    "refreshToken": outcome.refresh_token,
                }))?
            );
        }
        Command::Refresh { authorization } => {
            let service = connect(&args, &config).await?;
            let token = service.refresh(&authorization_header(authorization)?).await?;
            println!("{}", token);
        }
        Command::Revoke { authorization } => {
            let service = connect(&args, &config).await?;
            service.revoke(&authorization_header(authorization)?).await?;
        }
        Command::UpdateUser {
            authorization,
            email,
            password,
        } => {
            let service = connect(&args, &config).await?;
            let user = service
                .update_credentials(
                    &authorization_header(authorization)?,
                    email.as_deref(),
                    password.as_deref(),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&user)?);
        }
        // Handled before configuration
        Command::HashPassword { .. } | Command::VerifyPassword { .. } | Command::NewRefreshToken => {}
    }

    Ok(())
}

async fn connect(
    args: &Args,
    config: &chirpy_auth::AuthConfig,
) -> anyhow::Result<SessionService<MongoStore>> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    let store = MongoStore::connect(&client).await?;
    Ok(SessionService::new(config, Arc::new(store)))
}

fn authorization_header(value: &str) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(value)?);
    Ok(headers)
}
