use std::env;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use uuid::Uuid;

use dispatch_ledger::{auth::jwt::JwtService, config::AppConfig, db};

const USAGE: &str = "Usage:
  maintenance migrate
  maintenance issue-token <user-id> <username> [role] [ttl-hours]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("migrate") => migrate()?,
        Some("issue-token") => issue_token(&args[1..])?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn migrate() -> Result<()> {
    let config = AppConfig::from_env()?;
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let applied = db::run_migrations(&pool)?;
    println!(
        "Applied {applied} migration(s) to {}",
        config.redacted_database_url()
    );
    Ok(())
}

/// Signs a bearer token with the configured secret, for operators and smoke tests.
fn issue_token(args: &[String]) -> Result<()> {
    let (user_id, username) = match args {
        [user_id, username, ..] => (user_id, username),
        _ => bail!("issue-token needs a user id and a username\n{USAGE}"),
    };
    let user_id = Uuid::parse_str(user_id).context("user id must be a UUID")?;
    let role = args.get(2).map(String::as_str).unwrap_or("operator");
    let ttl_hours: i64 = match args.get(3) {
        Some(raw) => raw.parse().context("ttl-hours must be a whole number")?,
        None => 12,
    };

    let config = AppConfig::from_env()?;
    let jwt = JwtService::from_config(&config)?;
    let token = jwt.issue_token(user_id, username, role, Duration::hours(ttl_hours))?;
    println!("{token}");
    Ok(())
}
