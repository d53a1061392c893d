use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pbiscan")]
#[command(
    about = "Scan Power BI tenant workspaces through the admin API and export the metadata to JSON and CSV files."
)]
#[command(version)]
pub struct Args {
    /// Directory under which the per-tenant output directory is created
    #[arg(
        long = "output-dir",
        short = 'o',
        help = "Directory under which the {tenant} output directory is created",
        default_value = "."
    )]
    pub output_dir: String,

    /// Include personal workspaces in the listing
    #[arg(
        long = "include-personal",
        help = "Include personal (My workspace) workspaces in the scan"
    )]
    pub include_personal: bool,

    /// Workspaces submitted per scan request
    #[arg(long = "batch-size", help = "Workspaces submitted per scan request (1-100)", default_value = "100", value_parser = validate_batch_size)]
    pub batch_size: usize,

    /// Seconds to wait between scan status polls
    #[arg(
        long = "poll-interval",
        help = "Seconds to wait between scan status polls",
        default_value = "30"
    )]
    pub poll_interval: u64,

    /// Maximum status polls per batch before the batch is abandoned
    #[arg(long = "max-polls", help = "Maximum status polls per batch before the batch is abandoned", default_value = "10", value_parser = validate_max_polls)]
    pub max_polls: u32,

    /// Stop after the first batch, matching the original exporter's behavior
    #[arg(
        long = "first-batch-only",
        help = "Stop after the first batch (compatibility with the original exporter, which never processed later batches)"
    )]
    pub first_batch_only: bool,

    /// Fail the run instead of continuing with partial results
    #[arg(
        long = "strict",
        help = "Fail the run when any batch times out or fails instead of continuing with partial results"
    )]
    pub strict: bool,

    /// Enable debug mode for detailed output
    #[arg(
        long = "debug",
        short = 'd',
        help = "Enable debug mode for detailed diagnostic output"
    )]
    pub debug: bool,
}

fn validate_batch_size(value: &str) -> Result<usize, String> {
    let size: usize = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid batch size"))?;
    // The getInfo endpoint rejects requests with more than 100 workspaces
    if (1..=100).contains(&size) {
        Ok(size)
    } else {
        Err("batch size must be between 1 and 100".to_string())
    }
}

fn validate_max_polls(value: &str) -> Result<u32, String> {
    let polls: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid poll count"))?;
    if polls >= 1 {
        Ok(polls)
    } else {
        Err("max polls must be at least 1".to_string())
    }
}
