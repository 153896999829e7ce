//! Video cleaning through the `ffmpeg` command line tool.
//!
//! The source duration comes from `ffprobe`; ffmpeg then reports how far it
//! got on stdout (`-progress pipe:1`) and each `out_time_us` line is turned
//! into a completion fraction.

use crate::ports::video::{CleanedVideo, VideoCleanerPort};
use crate::ports::PortError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub struct FfmpegVideoCleaner {
    ffmpeg: String,
    ffprobe: String,
    work_dir: PathBuf,
}

impl FfmpegVideoCleaner {
    pub fn new(ffmpeg: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: String::from("ffprobe"),
            work_dir: work_dir.into(),
        }
    }

    pub fn with_ffprobe(mut self, ffprobe: impl Into<String>) -> Self {
        self.ffprobe = ffprobe.into();
        self
    }

    fn output_path(&self, source: &Path) -> Result<PathBuf, PortError> {
        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let path = tempfile::Builder::new()
            .prefix("photopress-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.work_dir)?
            .into_temp_path()
            .keep()
            .map_err(|e| PortError::Io(e.error))?;
        Ok(path)
    }

    /// Duration of `source` in microseconds, if ffprobe can tell.
    async fn duration_us(&self, source: &Path) -> Option<u64> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(source)
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                parse_duration_us(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                warn!("ffprobe exited with {} for {:?}", output.status, source);
                None
            }
            Err(e) => {
                warn!("Could not run {}: {}", self.ffprobe, e);
                None
            }
        }
    }
}

/// Arguments that copy every stream untouched while dropping global,
/// stream and chapter metadata. Progress goes to stdout.
fn clean_args(source: &Path, output: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = vec!["-y".into(), "-i".into(), source.into()];
    for flag in [
        "-map",
        "0",
        "-map_metadata",
        "-1",
        "-map_chapters",
        "-1",
        "-c",
        "copy",
        "-progress",
        "pipe:1",
        "-nostats",
    ] {
        args.push(flag.into());
    }
    args.push(output.into());
    args
}

/// ffprobe prints the duration in seconds, e.g. `12.345000`.
fn parse_duration_us(stdout: &str) -> Option<u64> {
    let seconds: f64 = stdout.trim().parse().ok()?;
    (seconds.is_finite() && seconds > 0.0).then(|| (seconds * 1_000_000.0) as u64)
}

fn parse_out_time_us(line: &str) -> Option<u64> {
    line.trim().strip_prefix("out_time_us=")?.parse().ok()
}

/// Publish the fraction done for every `out_time_us` line of a progress
/// stream. Without a known duration the stream is only drained.
async fn forward_progress<R>(
    reader: R,
    duration_us: Option<u64>,
    progress: &watch::Sender<f32>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let (Some(out_time), Some(duration)) = (parse_out_time_us(&line), duration_us) else {
            continue;
        };
        let fraction = (out_time as f64 / duration as f64).clamp(0.0, 1.0) as f32;
        progress.send_replace(fraction);
    }
    Ok(())
}

#[async_trait]
impl VideoCleanerPort for FfmpegVideoCleaner {
    async fn clean(
        &self,
        source: &Path,
        progress: &watch::Sender<f32>,
    ) -> Result<CleanedVideo, PortError> {
        if !tokio::fs::try_exists(source).await? {
            return Err(PortError::Missing(source.to_path_buf()));
        }
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let output = self.output_path(source)?;
        progress.send_replace(0.0);

        let duration = self.duration_us(source).await;
        debug!("Duration of {:?}: {:?}us", source, duration);

        let mut child = Command::new(&self.ffmpeg)
            .args(clean_args(source, &output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let (Some(stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(PortError::Unavailable(format!("{} output pipes", self.ffmpeg)));
        };

        let mut stderr_bytes = Vec::new();
        let (forwarded, drained, status) = tokio::join!(
            forward_progress(BufReader::new(stdout), duration, progress),
            stderr.read_to_end(&mut stderr_bytes),
            child.wait(),
        );
        if let Err(e) = forwarded {
            warn!("Lost ffmpeg progress for {:?}: {}", source, e);
        }
        drained?;
        let status = status?;
        debug!("ffmpeg finished for {:?}: {:?}", source, status);

        if !status.success() {
            let _ = tokio::fs::remove_file(&output).await;
            return Err(PortError::Command {
                program: self.ffmpeg.clone(),
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr_bytes).trim().to_string(),
            });
        }

        let size_bytes = tokio::fs::metadata(&output).await?.len();
        progress.send_replace(1.0);
        info!("Cleaned video {:?} -> {:?} ({} bytes)", source, output, size_bytes);

        Ok(CleanedVideo {
            uri: output,
            size_bytes,
        })
    }
}
