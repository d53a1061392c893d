//! pbiscan - Power BI tenant metadata scanner
//!
//! Authenticates against the Power BI admin API, scans every modified
//! organizational workspace in batches and exports the metadata to
//! per-workspace JSON files and flattened CSV tables.
use clap::Parser;
use log::{error, info};
use pbiscan::{Args, ScanRunConfig};
use powerbi_admin::PowerBiClient;
use std::path::Path;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(code) = run(&args).await {
        std::process::exit(code);
    }
}

async fn run(args: &Args) -> Result<(), i32> {
    info!("pbiscan - Power BI tenant metadata scanner");

    // Credentials are read from the environment exactly once, here
    let credentials = pbiscan::load_tenant_credentials().map_err(|e| {
        error!("{e}");
        1
    })?;
    let tenant = credentials.tenant.clone();

    let client = PowerBiClient::new(credentials.to_config()).map_err(|e| {
        error!("Failed to create Power BI client: {e}");
        1
    })?;

    let workspaces = client
        .workspace_api()
        .list_modified(!args.include_personal)
        .await
        .map_err(|e| {
            error!("Failed to list workspaces: {e}");
            1
        })?;

    let config = ScanRunConfig::from_args(args);
    let report = pbiscan::run_tenant_scan(&client, &workspaces, &config)
        .await
        .map_err(|e| {
            error!("{e}");
            1
        })?;

    let output_dir = Path::new(&args.output_dir);
    let json_files = pbiscan::write_json_exports(output_dir, &tenant, &report.result)
        .map_err(|e| {
            error!("JSON export failed: {e}");
            1
        })?;

    let tables = pbiscan::build_tables(&report.result);
    let csv_files = pbiscan::write_csv_exports(output_dir, &tenant, &tables).map_err(|e| {
        error!("CSV export failed: {e}");
        1
    })?;

    info!(
        "Run complete: {} workspace(s) listed, {} scanned, {} batch(es) dropped, {} file(s) written",
        workspaces.len(),
        report.result.workspaces.len(),
        report.dropped.len(),
        json_files.len() + csv_files.len()
    );

    Ok(())
}
