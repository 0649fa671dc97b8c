// A small CLI client for galley-server: uploads a transcript, shows upload
// progress, and saves the formatted document next to the current directory.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use galley::TransferController;
use galley::progress::ProgressSink;

#[derive(Parser, Debug)]
#[command(name = "galley")]
#[command(about = "Upload a transcript and download the formatted document")]
struct Params {
    /// Path to the raw transcript text file.
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Base URL of a running galley-server.
    #[arg(long = "server", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Directory the formatted document is saved into.
    #[arg(long = "out", default_value = ".")]
    out_dir: PathBuf,
}

struct BarSink {
    bar: ProgressBar,
}

impl ProgressSink for BarSink {
    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    galley::logging::init();
    let params = Params::parse();

    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos:>3}%",
    )?);

    let endpoint = format!("{}/v1/format", params.server.trim_end_matches('/'));
    let controller = TransferController::new(endpoint);

    let sink = Arc::new(BarSink { bar: bar.clone() });
    let result = controller.submit(&params.file, &params.out_dir, sink).await;
    bar.finish();

    let saved = result?;
    println!("saved {}", saved.display());
    Ok(())
}
