use std::sync::Arc;

use admin_client::{
    complaint_list, staff_list, student_list, update_complaint_status, AdminSession,
    ComplaintFilters, ComplaintFiltersPatch,
};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use list_state::{FilterMap, ListFilters, ListInit, ListStateController, ListStatus, SortMode};
use serde::Serialize;
use shared::{
    domain::{ComplaintId, ComplaintStatus},
    error::ApiException,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "admin_cli", about = "Complaint desk admin console")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Overrides the configured session token.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Email a one-time password to an admin.
    Otp {
        #[arg(long)]
        email: String,
    },
    /// Exchange an OTP for a session token.
    Verify {
        #[arg(long)]
        email: String,
        #[arg(long)]
        code: String,
    },
    /// Show one page of a collection.
    List(ListArgs),
    /// Change a complaint's status.
    SetStatus {
        #[arg(long)]
        complaint: i64,
        #[arg(long)]
        status: String,
    },
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(value_enum)]
    resource: ResourceArg,
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    page: i64,
    #[arg(long, allow_negative_numbers = true)]
    limit: Option<i64>,
    /// Sort column; repeat to toggle direction.
    #[arg(long = "sort")]
    sort: Vec<String>,
    /// `key=value` filter; repeatable.
    #[arg(long = "filter", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
    #[arg(long)]
    search: Option<String>,
    /// Order only the fetched page locally.
    #[arg(long)]
    client_sort: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ResourceArg {
    Students,
    Staff,
    Complaints,
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got `{raw}`")),
    }
}

fn complaint_patch(
    filters: &[(String, String)],
    search: Option<String>,
) -> Result<ComplaintFiltersPatch> {
    let mut patch = ComplaintFiltersPatch {
        search,
        ..ComplaintFiltersPatch::default()
    };
    for (key, value) in filters {
        match key.as_str() {
            "status" if value.is_empty() => patch.status = Some(None),
            "status" => {
                let status = ComplaintStatus::parse(value)
                    .ok_or_else(|| anyhow!("unknown complaint status `{value}`"))?;
                patch.status = Some(Some(status));
            }
            "hostel" => patch.hostel = Some(value.clone()),
            "search" => patch.search = Some(value.clone()),
            other => return Err(anyhow!("complaints cannot be filtered by `{other}`")),
        }
    }
    Ok(patch)
}

fn filter_map_patch(filters: &[(String, String)], search: Option<String>) -> FilterMap {
    let mut patch: FilterMap = filters.iter().cloned().collect();
    if let Some(search) = search {
        patch.insert("search".to_string(), search);
    }
    patch
}

async fn show_page<T, F>(
    list: ListStateController<T, F>,
    args: &ListArgs,
    patch: F::Patch,
) -> Result<()>
where
    T: Clone + Serialize + Send + Sync + 'static,
    F: ListFilters,
{
    // Intermediate fetches are superseded; only the last one is awaited.
    if let Some(limit) = args.limit {
        drop(list.set_limit(limit).await?);
    }
    drop(list.merge_filters(patch).await);
    for field in &args.sort {
        drop(list.set_sort(field).await);
    }
    list.go_to_page(args.page).await.settled().await;

    let snapshot = list.snapshot();
    let total_pages = snapshot.total_pages();
    if total_pages > 0 && u64::from(snapshot.page()) > total_pages {
        list.go_to_page(args.page).await.settled().await;
    }

    let snapshot = list.snapshot();
    if snapshot.status() == ListStatus::Failed {
        return Err(anyhow!(
            "failed to load page: {}",
            snapshot.error().unwrap_or("unknown error")
        ));
    }
    for item in snapshot.visible_items() {
        println!("{}", serde_json::to_string(&item)?);
    }
    println!(
        "page {}/{} ({} total)",
        snapshot.page(),
        snapshot.total_pages(),
        snapshot.total()
    );
    Ok(())
}

fn needs_login(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ApiException>())
        .any(|api| api.code.requires_login())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await.map_err(|err| {
        if needs_login(&err) {
            err.context("session rejected; sign in again with `otp` and `verify`")
        } else {
            err
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    if let Some(token) = cli.token {
        settings.api_token = Some(token);
    }

    let session = Arc::new(match &settings.api_token {
        Some(token) => {
            AdminSession::with_token(&settings.api_url, settings.request_timeout(), token)?
        }
        None => AdminSession::new(&settings.api_url, settings.request_timeout())?,
    });

    match cli.command {
        Command::Otp { email } => {
            session.request_otp(&email).await?;
            println!("OTP sent to {email}");
        }
        Command::Verify { email, code } => {
            let admin_name = session.verify_otp(&email, &code).await?;
            let token = session
                .token()
                .await
                .context("server accepted the OTP but issued no token")?;
            println!("Signed in as {admin_name}");
            println!("export APP__API_TOKEN={token}");
        }
        Command::List(args) => {
            let sort_mode = if args.client_sort {
                SortMode::Client
            } else {
                SortMode::Server
            };
            match args.resource {
                ResourceArg::Students => {
                    let init = ListInit::new(FilterMap::new())
                        .with_limit(settings.page_size)
                        .with_sort_mode(sort_mode);
                    let patch = filter_map_patch(&args.filters, args.search.clone());
                    show_page(student_list(&session, init)?, &args, patch).await?;
                }
                ResourceArg::Staff => {
                    let init = ListInit::new(FilterMap::new())
                        .with_limit(settings.page_size)
                        .with_sort_mode(sort_mode);
                    let patch = filter_map_patch(&args.filters, args.search.clone());
                    show_page(staff_list(&session, init)?, &args, patch).await?;
                }
                ResourceArg::Complaints => {
                    let init = ListInit::new(ComplaintFilters::default())
                        .with_limit(settings.page_size)
                        .with_sort_mode(sort_mode);
                    let patch = complaint_patch(&args.filters, args.search.clone())?;
                    show_page(complaint_list(&session, init)?, &args, patch).await?;
                }
            }
        }
        Command::SetStatus { complaint, status } => {
            let status = ComplaintStatus::parse(&status)
                .ok_or_else(|| anyhow!("unknown complaint status `{status}`"))?;
            let list = complaint_list(
                &session,
                ListInit::new(ComplaintFilters::default()).with_limit(settings.page_size),
            )?;
            list.load().await.settled().await;
            update_complaint_status(&session, &list, ComplaintId(complaint), status).await?;
            info!(complaint, "status change applied");
            println!("complaint {complaint} is now {}", status.as_str());
        }
    }

    Ok(())
}
