use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::Pattern;
use mosketch_bevy::{BevyScene, BevySession, SceneDesc};
use mosketch_tools::{format_report_pretty, inspect_stream, run_tcp, DriveOptions};
use retarget::{SessionConfig, StreamingMode, DEFAULT_PEER_PORT};

#[derive(Parser)]
#[command(
    name = "mosketch-link",
    version,
    about = "Mosketch retargeting link driver and capture tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream poses between a Mosketch peer and a scene description.
    Stream {
        /// Peer IP address, optionally with a port.
        #[arg(long, default_value = "127.0.0.1")]
        address: String,
        /// Port used when the address has none.
        #[arg(long, default_value_t = DEFAULT_PEER_PORT)]
        port: u16,
        /// Which scene nodes receive streamed poses.
        #[arg(long, value_enum, default_value_t = Mode::Joints)]
        mode: Mode,
        /// Scene description JSON.
        #[arg(long)]
        scene: PathBuf,
        /// Send the scene pose to the peer after each hierarchy handshake.
        #[arg(long)]
        update_on_connect: bool,
        /// Write the final scene pose as JSON.
        #[arg(long)]
        dump: Option<PathBuf>,
        /// Record every received byte for later inspection.
        #[arg(long)]
        capture: Option<PathBuf>,
        /// Close the link after this many seconds.
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Summarize captured byte streams.
    Inspect {
        /// Capture file, or a directory of captures.
        capture_path: PathBuf,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = InspectFormat::Pretty)]
        format: InspectFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Joints,
    Controllers,
}

impl From<Mode> for StreamingMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Joints => Self::Joints,
            Mode::Controllers => Self::Controllers,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Stream {
            address,
            port,
            mode,
            scene,
            update_on_connect,
            dump,
            capture,
            duration,
        } => {
            let desc = SceneDesc::load(&scene)?;
            let mut scene = BevyScene::from_desc(&desc).context("build scene")?;
            let config = SessionConfig {
                peer_port: port,
                ..SessionConfig::default().with_mode(mode.into())
            };
            let mut session = BevySession::new(config);
            let options = DriveOptions {
                update_on_connect,
                deadline: duration.map(|secs| Instant::now() + Duration::from_secs(secs)),
            };

            let mut capture = capture
                .as_ref()
                .map(|path| {
                    File::create(path)
                        .map(BufWriter::new)
                        .with_context(|| format!("create capture {}", path.display()))
                })
                .transpose()?;
            let summary = run_tcp(
                &address,
                &mut session,
                &mut scene,
                &options,
                capture.as_mut().map(|writer| writer as &mut dyn Write),
            )?;
            println!(
                "received {} bytes, sent {} frames ({} bytes)",
                summary.bytes_received, summary.frames_sent, summary.bytes_sent
            );

            if let Some(path) = dump {
                let json = scene.to_desc().to_json_pretty()?;
                fs::write(&path, json).with_context(|| format!("write dump {}", path.display()))?;
            }
        }
        Command::Inspect {
            capture_path,
            glob,
            format,
        } => {
            let paths = if capture_path.is_dir() {
                collect_capture_paths(&capture_path, glob.as_deref())?
            } else {
                vec![capture_path]
            };
            for path in paths {
                let bytes =
                    fs::read(&path).with_context(|| format!("read capture {}", path.display()))?;
                let report = inspect_stream(&bytes, &wire::Limits::default());
                match format {
                    InspectFormat::Json => {
                        let json =
                            serde_json::to_string_pretty(&report).context("serialize json")?;
                        println!("{json}");
                    }
                    InspectFormat::Pretty => {
                        println!("== {} ==", path.display());
                        print!("{}", format_report_pretty(&report));
                    }
                }
            }
        }
    }
    Ok(())
}

fn collect_capture_paths(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
