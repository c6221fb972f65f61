use anyhow::{bail, Context, Result};
use audit_core::chain::export_file_name;
use audit_core::{now_millis, verify_sequence, Block, Verification};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "audit-cli")]
#[command(about = "CLI client for the PlastiSure audit node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a classification result
    Submit {
        /// Plastic category, e.g. PET
        #[arg(long)]
        plastic_type: String,
        /// Contamination label, e.g. Low
        #[arg(long)]
        contamination: String,
        /// Recyclability score, 0-100
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },
    /// Print the retained chain
    Chain,
    /// Ask the node to re-verify its chain
    Verify,
    /// Verify a previously exported audit log offline
    VerifyFile {
        path: PathBuf,
    },
    /// Download the audit log into a timestamped JSON file
    Export {
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Clear the chain (statistics are kept)
    Clear,
    /// Print cumulative statistics
    Stats,
    /// Show whether the node can reach the classifier
    Health,
}

#[derive(Serialize)]
struct ScanIn {
    plastic_type: String,
    contamination: String,
    recyclability_score: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();

    match cli.cmd {
        Command::Submit {
            plastic_type,
            contamination,
            score,
        } => {
            let scan = ScanIn {
                plastic_type,
                contamination,
                recyclability_score: score,
            };
            let res = client.post(format!("{node}/scan")).json(&scan).send().await?;
            print_response(res).await?;
        }
        Command::Chain => {
            print_response(client.get(format!("{node}/chain")).send().await?).await?;
        }
        Command::Verify => {
            print_response(client.get(format!("{node}/chain/verify")).send().await?).await?;
        }
        Command::VerifyFile { path } => {
            let report = verify_file(&path)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if !report.is_valid() {
                bail!("audit log {} failed verification", path.display());
            }
        }
        Command::Export { out_dir } => {
            let res = client.get(format!("{node}/chain/export")).send().await?;
            if res.status() == reqwest::StatusCode::NOT_FOUND {
                println!("No data to export");
                return Ok(());
            }
            let res = res.error_for_status()?;
            let bytes = res.bytes().await?;
            let path = out_dir.join(export_file_name(now_millis()));
            std::fs::write(&path, &bytes)
                .with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), bytes = bytes.len(), "audit log exported");
            println!("Audit log exported to {}", path.display());
        }
        Command::Clear => {
            print_response(client.delete(format!("{node}/chain")).send().await?).await?;
        }
        Command::Stats => {
            print_response(client.get(format!("{node}/stats")).send().await?).await?;
        }
        Command::Health => {
            print_response(client.get(format!("{node}/classifier/health")).send().await?).await?;
        }
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    println!("{body}");
    Ok(())
}

/// Exported files hold no chain pointer, so only the links between the
/// blocks themselves can be checked.
fn verify_file(path: &Path) -> Result<Verification> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let blocks: Vec<Block> =
        serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
    Ok(verify_sequence(&blocks, None))
}
