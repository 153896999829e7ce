//! PhotoPress Binary - Clean and shrink media from the command line
//!
//! Usage: photopress <original|1mb|500kb|200kb|BYTES> <file>...
//!
//! It wires up:
//! - Local adapters (image codec, ffmpeg, filesystem library, JSON entitlement)
//! - The simulated rewarded ad, shown before a free-tier batch
//! - The monetization controller driving the batch save

use futures::future::join_all;
use photopress::adapters::local::{
    AdEventHub, FfmpegVideoCleaner, FsLibrary, JsonEntitlementStore, LocalImageCodec,
    SimulatedRewardedAd,
};
use photopress::application::press::BatchRequest;
use photopress::domain::media::TargetSize;
use photopress::domain::naming::FileNames;
use photopress::domain::selection::Selection;
use photopress::ports::entitlement::EntitlementPort;
use photopress::{ControllerCommand, MonetizationController, Notice, PressConfig, PressService};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    let config = PressConfig::from_env();

    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let target: TargetSize = match args.next() {
        Some(label) => match label.parse() {
            Ok(target) => target,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        None => config.default_target,
    };
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();
    if files.is_empty() {
        eprintln!("Usage: photopress <original|1mb|500kb|200kb|BYTES> <file>...");
        std::process::exit(2);
    }

    // 1. Adapters (Local implementations)
    let entitlement = JsonEntitlementStore::open(&config.entitlement_file).await;
    let premium = entitlement.is_premium();
    let codec = LocalImageCodec::new(&config.work_dir);

    // 2. Selection
    let probes = join_all(files.iter().map(|file| codec.probe(file))).await;
    let mut picked = Vec::new();
    for (file, probe) in files.iter().zip(probes) {
        match probe {
            Ok(asset) => picked.push(asset),
            Err(e) => eprintln!("Skipping {:?}: {}", file, e),
        }
    }

    let mut selection = Selection::new();
    match selection.add(picked, premium) {
        Ok(outcome) if outcome.truncated > 0 => {
            println!(
                "Only the first {} items are processed, {} left out",
                outcome.added, outcome.truncated
            );
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
    if selection.is_empty() {
        eprintln!("Nothing to process");
        std::process::exit(1);
    }

    // 3. Application Services
    let press = Arc::new(PressService::with_policy(
        codec,
        FfmpegVideoCleaner::new(&config.ffmpeg, &config.work_dir).with_ffprobe(&config.ffprobe),
        FsLibrary::new(&config.output_dir, &config.cache_dir),
        config.search,
    ));

    let hub = Arc::new(AdEventHub::new());
    let ad = SimulatedRewardedAd::new(&config.ads, hub);

    let (notice_tx, mut notices) = mpsc::unbounded_channel();
    let controller = MonetizationController::new(ad, entitlement, press, notice_tx);

    let (commands, command_rx) = mpsc::channel(8);
    let handle = tokio::spawn(controller.run(command_rx));

    // 4. Save everything
    let request = BatchRequest {
        assets: selection.assets().to_vec(),
        target,
        names: FileNames::new(),
        timestamp: chrono::Local::now().naive_local(),
    };
    if commands
        .send(ControllerCommand::SaveAll(request))
        .await
        .is_err()
    {
        eprintln!("Controller stopped before the batch was sent");
        std::process::exit(1);
    }

    let mut exit_code = 0;
    while let Some(notice) = notices.recv().await {
        match notice {
            Notice::BatchDone(summary) => {
                for (path, report) in summary.saved_paths.iter().zip(&summary.reports) {
                    match report.reduction_percent() {
                        Some(percent) => println!(
                            "{} ({} bytes, {:.1}% smaller)",
                            path.display(),
                            report.processed_bytes,
                            percent
                        ),
                        None => println!("{} ({} bytes)", path.display(), report.processed_bytes),
                    }
                }
                println!("Saved {}, failed {}", summary.saved, summary.failed);
                if summary.failed > 0 {
                    exit_code = 1;
                }
                break;
            }
            Notice::PremiumChanged(_) => continue,
            other => {
                eprintln!("Batch not saved: {:?}", other);
                exit_code = 1;
                break;
            }
        }
    }

    drop(commands);
    if let Err(e) = handle.await {
        eprintln!("Controller task failed: {:?}", e);
        exit_code = 1;
    }
    std::process::exit(exit_code);
}
