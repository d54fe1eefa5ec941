//! Download a small batch of pages into `downloads/`.
//!
//! Run with `RUST_LOG=bookfetch=debug` to follow each task through its
//! phases.

use bookfetch::download::Status;
use bookfetch::DownloadManagerBuilder;
use color_eyre::Result;
use reqwest::Method;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut manager = DownloadManagerBuilder::new()
        .concurrency(4)
        .max_threads(8)
        .sleep(Duration::from_millis(100))
        .on_complete(|task| {
            if let Status::Fail(error) = task.status() {
                eprintln!("[Failed] {} - {}", task.display_name(), error);
            }
        })
        .build()?;

    // One large file split into ranges, then a run of small ones.
    manager.add_task(
        "https://proof.ovh.net/files/10Mb.dat",
        Method::GET,
        None,
        None,
        "downloads",
        "10Mb.dat",
        8,
    )?;
    for i in 1..=10 {
        manager.add_task(
            &format!("https://httpbin.org/bytes/256000?seed={i}"),
            Method::GET,
            None,
            None,
            "downloads",
            &format!("page-{i:03}.bin"),
            1,
        )?;
    }

    let report = manager.start().await;
    println!("{report}");

    Ok(())
}
