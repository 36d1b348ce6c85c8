//! corosdown - download activities from COROS Training Center
//!
//! Downloads one or more activities (or the latest one) in any export
//! format the site offers. Honors the single-session workaround: pass
//! the browser's CPL-coros-token cookie value with -T to avoid a fresh
//! login that would kick the browser session out.
//!
//! Usage:
//!   corosdown -T <token> 433577465829212261 -t gpx
//!   corosdown -u me@example.com            # prompts for the password
//!
//! Environment:
//!   COROS_API_BASE / COROS_WEB_BASE - endpoint overrides
//!   RUST_LOG                        - log level (default: info)

use clap::Parser;
use corostc::{sanitize_title, CorosClient, CorosConfig, Credentials, FileType, SportType};
use dialoguer::{Input, Password};
use eyre::{bail, eyre, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "corosdown", version, about = "Download activities from COROS Training Center")]
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

    /// Activity IDs to download. If unspecified, latest activity of
    /// logged-in user.
    activities: Vec<String>,

    /// Format in which to download activities (csv, gpx, kml, tcx, fit)
    #[arg(short = 't', long = "type", value_name = "FORMAT", default_value = "fit")]
    file_type: FileType,

    /// Label activity files by number, rather than by their titles
    #[arg(short = 'N', long)]
    number: bool,

    /// Write activity to standard output
    #[arg(short = 'c', long, conflicts_with = "directory")]
    stdout: bool,

    /// Directory in which to store activity files (default is current
    /// directory)
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,
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

    if args.stdout && args.activities.len() > 1 {
        bail!("specify at most one activity with -c/--stdout");
    }

    let credentials = resolve_credentials(&args)?;
    let config = CorosConfig::default();
    let client = CorosClient::connect(config, credentials).await?;

    let activities = if args.activities.is_empty() {
        let latest = client
            .latest_activity()
            .await?
            .ok_or_else(|| eyre!("No latest activity found for user."))?;
        eprintln!(
            "Found latest activity: {:?} ({})",
            latest.name,
            latest.sport()
        );
        vec![latest.label_id]
    } else {
        args.activities.clone()
    };

    let progress = if activities.len() > 1 && !args.stdout {
        let bar = ProgressBar::new(activities.len() as u64);
        bar.set_style(ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}").unwrap());
        Some(bar)
    } else {
        None
    };

    let mut written = 0usize;
    for activity_id in &activities {
        if let Some(bar) = &progress {
            bar.set_message(activity_id.clone());
        }

        let web_url = client.config().activity_url(activity_id);
        let data = match client
            .download_activity(activity_id, SportType::Run, args.file_type)
            .await
        {
            Ok(data) => data,
            Err(e) => {
                client.stats().record_failure();
                warn!(
                    "Error downloading activity {} (check {}): {}",
                    activity_id, web_url, e
                );
                if let Some(bar) = &progress {
                    bar.inc(1);
                }
                continue;
            }
        };

        if args.stdout {
            std::io::stdout().write_all(&data)?;
            eprintln!("  Wrote <stdout> from {}", web_url);
        } else {
            let filename = format!(
                "{}.{}",
                file_stem(&client, activity_id, args.number).await,
                args.file_type.extension()
            );
            let path = args
                .directory
                .clone()
                .unwrap_or_default()
                .join(&filename);
            std::fs::write(&path, &data)?;
            eprintln!("  Wrote {} from {}", path.display(), web_url);
        }

        written += 1;
        if let Some(bar) = &progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    eprintln!("{}", client.stats().summary());

    if written == 0 {
        bail!("no activities were downloaded");
    }
    Ok(())
}

/// Name a downloaded file after the activity title where possible,
/// falling back to the label ID (-N forces the fallback).
async fn file_stem(client: &CorosClient, activity_id: &str, by_number: bool) -> String {
    if !by_number {
        // Best effort only; an unreachable detail endpoint or an
        // unprintable title just means we name the file by its ID.
        if let Ok(detail) = client.activity_detail(activity_id, SportType::Run).await {
            if let Some(name) = detail.summary.and_then(|s| sanitize_title(&s.name)) {
                return name;
            }
        }
    }
    activity_id.to_string()
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
