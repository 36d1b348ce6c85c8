//! corosup - upload FIT files to COROS Training Center
//!
//! Uploads one or more FIT files through the site's import endpoint and
//! prints the web URL of each created activity (recovered by matching
//! the FIT session start time against the activity listing, since the
//! import response does not name the new activity).
//!
//! Usage:
//!   corosup -T <token> morning_run.fit
//!   corosup -u me@example.com ride1.fit ride2.fit
//!
//! Environment:
//!   COROS_API_BASE / COROS_WEB_BASE - endpoint overrides
//!   RUST_LOG                        - log level (default: info)

use clap::Parser;
use corostc::{CorosClient, CorosConfig, Credentials};
use dialoguer::{Input, Password};
use eyre::{bail, Result};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "corosup", version, about = "Upload FIT files to COROS Training Center")]
struct Args {
    /// COROS Training Center username (email)
    #[arg(short = 'u', long, env = "COROS_USERNAME")]
    username: Option<String>,

    /// Account password (prompted for when omitted)
    #[arg(short = 'p', long, env = "COROS_PASSWORD")]
    password: Option<String>,

    /// Access token or CPL-coros-token cookie value
    #[arg(short = 'T', long, env = "COROS_ACCESS_TOKEN")]
    accesstoken: Option<String>,

    /// FIT files to upload
    #[arg(required = true, value_name = "FITFILE")]
    fitfiles: Vec<PathBuf>,

    /// Gzip-compress upload bodies
    #[arg(short = 'z', long)]
    compress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();
    let credentials = resolve_credentials(&args)?;
    let client = CorosClient::connect(CorosConfig::default(), credentials).await?;

    let mut uploaded = 0usize;
    for fitfile in &args.fitfiles {
        match client.upload_activity(fitfile, args.compress).await {
            Ok(Some(label_id)) => {
                println!(
                    "{} -> {}",
                    fitfile.display(),
                    client.config().activity_url(&label_id)
                );
                uploaded += 1;
            }
            Ok(None) => {
                println!("{} -> <couldn't determine URL>", fitfile.display());
                uploaded += 1;
            }
            Err(e) => {
                client.stats().record_failure();
                warn!("Error uploading {}: {}", fitfile.display(), e);
            }
        }
    }

    println!("Uploaded {} of {} files", uploaded, args.fitfiles.len());
    eprintln!("{}", client.stats().summary());

    if uploaded < args.fitfiles.len() {
        bail!("{} upload(s) failed", args.fitfiles.len() - uploaded);
    }
    Ok(())
}

/// Use the token when given; otherwise fill in username/password,
/// prompting for whatever is missing.
fn resolve_credentials(args: &Args) -> Result<Credentials> {
    if let Some(token) = &args.accesstoken {
        return Ok(Credentials::Token {
            access_token: token.clone(),
        });
    }

    let username = match &args.username {
        Some(u) => u.clone(),
        None => Input::new()
            .with_prompt("COROS Training Center Username")
            .interact_text()?,
    };
    let password = match &args.password {
        Some(p) => p.clone(),
        None => Password::new()
            .with_prompt("COROS Training Center Password")
            .interact()?,
    };

    Ok(Credentials::Password { username, password })
}
