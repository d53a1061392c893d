pub mod cli;
pub mod credentials;
pub mod export;
pub mod flatten;
pub mod scan;

pub use cli::Args;
pub use credentials::{CredentialError, SecureSecret, TenantCredentials, load_tenant_credentials};
pub use export::{ExportError, write_csv_exports, write_json_exports};
pub use flatten::{Table, build_tables};
pub use scan::{
    DroppedBatch, ScanRunConfig, ScanRunError, ScanRunReport, chunk_workspaces, run_tenant_scan,
};
