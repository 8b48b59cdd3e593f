use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libd20::{DiceTray, FinalizeReason, Pose, Real, TrayConfig};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Roll a simulated d20 in a walled tray
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of rolls
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    rolls: u32,

    /// Seed for reproducible rolls; OS entropy when absent
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated frame rate driving the fixed-step accumulator
    #[arg(long, default_value_t = 60.0, value_parser = parse_fps)]
    fps: Real,

    /// Give up on a roll after this many frames
    #[arg(long, default_value_t = 600)]
    max_frames: u32,

    /// JSON tray configuration; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Debug logging on stderr (overrides RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Serialize)]
struct RollRecord {
    value: u32,
    face_index: usize,
    reason: FinalizeReason,
    sim_seconds: Real,
    frames: u32,
    pose: Pose,
}

#[derive(Debug, Clone, Serialize)]
struct BatchResult {
    rolls: Vec<RollRecord>,
    total: u32,
    mean: f64,
}

impl BatchResult {
    fn new(rolls: Vec<RollRecord>) -> Self {
        let total = rolls.iter().map(|r| r.value).sum();
        let mean = if rolls.is_empty() {
            0.0
        } else {
            f64::from(total) / rolls.len() as f64
        };
        Self { rolls, total, mean }
    }
}

fn parse_fps(s: &str) -> Result<Real, String> {
    let fps: Real = s
        .parse()
        .map_err(|_| format!("Invalid frame rate: {}", s))?;
    if !(fps.is_finite() && fps > 0.0) {
        return Err(format!("Invalid frame rate: {}. Must be greater than 0", s));
    }
    Ok(fps)
}

fn reason_label(reason: FinalizeReason) -> &'static str {
    match reason {
        FinalizeReason::Settled => "settled",
        FinalizeReason::TimedOut => "timed_out",
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<TrayConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            serde_json::from_str(&text)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
        }
        None => TrayConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_simulation(args: &Args, config: TrayConfig) -> Result<BatchResult, Box<dyn std::error::Error>> {
    let mut tray = match args.seed {
        Some(seed) => DiceTray::from_seed(config, seed)?,
        None => DiceTray::from_entropy(config)?,
    };
    let frame_dt = 1.0 / args.fps;

    let mut rolls = Vec::with_capacity(args.rolls as usize);
    for i in 0..args.rolls {
        let (outcome, frames) = tray
            .roll_blocking(frame_dt, args.max_frames)
            .ok_or_else(|| format!("Roll {} did not finish within {} frames", i + 1, args.max_frames))?;
        rolls.push(RollRecord {
            value: outcome.result.value(),
            face_index: outcome.result.face_index,
            reason: outcome.reason,
            sim_seconds: outcome.elapsed,
            frames,
            pose: outcome.pose,
        });
    }
    Ok(BatchResult::new(rolls))
}

fn format_output(batch: &BatchResult, output_format: OutputFormat) -> Result<String, Box<dyn std::error::Error>> {
    match output_format {
        OutputFormat::Text => {
            let mut output = String::new();
            let many = batch.rolls.len() > 1;
            for (i, roll) in batch.rolls.iter().enumerate() {
                if many {
                    output.push_str(&format!("Roll {}: ", i + 1));
                }
                output.push_str(&format!(
                    "D20: {} ({} after {:.2}s, {} frames)\n",
                    roll.value,
                    reason_label(roll.reason),
                    roll.sim_seconds,
                    roll.frames
                ));
            }
            output.push_str(&format!("Total: {}\n", batch.total));
            if many {
                output.push_str(&format!("Mean: {:.2}\n", batch.mean));
            }
            Ok(output)
        }
        OutputFormat::Json => {
            if batch.rolls.len() == 1 {
                Ok(serde_json::to_string_pretty(&batch.rolls[0])?)
            } else {
                Ok(serde_json::to_string_pretty(batch)?)
            }
        }
        OutputFormat::Csv => {
            let mut output = String::from("Roll,Value,Face,Reason,Seconds,Frames,X,Y,Z\n");
            for (i, roll) in batch.rolls.iter().enumerate() {
                let p = roll.pose.position;
                output.push_str(&format!(
                    "{},{},{},{},{:.4},{},{:.4},{:.4},{:.4}\n",
                    i + 1,
                    roll.value,
                    roll.face_index,
                    reason_label(roll.reason),
                    roll.sim_seconds,
                    roll.frames,
                    p.x,
                    p.y,
                    p.z
                ));
            }
            Ok(output)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(args.config.as_ref())?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::debug!(rolls = args.rolls, seed = ?args.seed, fps = args.fps, "starting");

    match run_simulation(&args, config) {
        Ok(batch) => {
            let output = format_output(&batch, args.output)?;
            print!("{}", output);
        }
        Err(e) => {
            eprintln!("Error during simulation: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libd20::math::{Point3, UnitQuaternion};

    fn record(value: u32, reason: FinalizeReason) -> RollRecord {
        RollRecord {
            value,
            face_index: value as usize - 1,
            reason,
            sim_seconds: 2.5,
            frames: 150,
            pose: Pose {
                position: Point3::new(0.5, 0.8, -1.0),
                orientation: UnitQuaternion::identity(),
            },
        }
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["d20tray"]).unwrap();
        assert_eq!(args.rolls, 1);
        assert_eq!(args.seed, None);
        assert_eq!(args.fps, 60.0);
        assert_eq!(args.max_frames, 600);
        assert_eq!(args.output, OutputFormat::Text);
        assert!(!args.verbose);
        assert!(!args.print_config);
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "d20tray", "--rolls", "5", "--seed", "42", "--fps", "30", "--output", "csv",
            "--config", "tray.json", "--verbose",
        ])
        .unwrap();
        assert_eq!(args.rolls, 5);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.fps, 30.0);
        assert_eq!(args.output, OutputFormat::Csv);
        assert_eq!(args.config, Some(PathBuf::from("tray.json")));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_invalid() {
        assert!(Args::try_parse_from(["d20tray", "--rolls", "0"]).is_err());
        assert!(Args::try_parse_from(["d20tray", "--fps", "0"]).is_err());
        assert!(Args::try_parse_from(["d20tray", "--fps", "fast"]).is_err());
        assert!(Args::try_parse_from(["d20tray", "--output", "xml"]).is_err());
    }

    #[test]
    fn test_batch_summary() {
        let batch = BatchResult::new(vec![
            record(4, FinalizeReason::Settled),
            record(15, FinalizeReason::TimedOut),
        ]);
        assert_eq!(batch.total, 19);
        assert!((batch.mean - 9.5).abs() < 1e-9);
        assert_eq!(BatchResult::new(vec![]).mean, 0.0);
    }

    #[test]
    fn test_format_output_text() {
        let single = BatchResult::new(vec![record(17, FinalizeReason::Settled)]);
        let output = format_output(&single, OutputFormat::Text).unwrap();
        assert!(output.contains("D20: 17 (settled"));
        assert!(output.contains("Total: 17"));
        assert!(!output.contains("Roll 1"));

        let batch = BatchResult::new(vec![
            record(4, FinalizeReason::Settled),
            record(15, FinalizeReason::TimedOut),
        ]);
        let output = format_output(&batch, OutputFormat::Text).unwrap();
        assert!(output.contains("Roll 1: D20: 4"));
        assert!(output.contains("Roll 2: D20: 15 (timed_out"));
        assert!(output.contains("Total: 19"));
        assert!(output.contains("Mean: 9.50"));
    }

    #[test]
    fn test_format_output_json() {
        let single = BatchResult::new(vec![record(20, FinalizeReason::Settled)]);
        let output = format_output(&single, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["value"], 20);
        assert_eq!(parsed["face_index"], 19);
        assert_eq!(parsed["reason"], "Settled");

        let batch = BatchResult::new(vec![
            record(4, FinalizeReason::Settled),
            record(15, FinalizeReason::TimedOut),
        ]);
        let output = format_output(&batch, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["total"], 19);
        assert_eq!(parsed["rolls"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_format_output_csv() {
        let batch = BatchResult::new(vec![
            record(4, FinalizeReason::Settled),
            record(15, FinalizeReason::TimedOut),
        ]);
        let output = format_output(&batch, OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Roll,Value,Face,Reason,Seconds,Frames,X,Y,Z");
        assert_eq!(lines[1], "1,4,3,settled,2.5000,150,0.5000,0.8000,-1.0000");
        assert!(lines[2].starts_with("2,15,14,timed_out,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_run_simulation_is_reproducible() {
        let args = Args::try_parse_from(["d20tray", "--rolls", "2", "--seed", "9"]).unwrap();
        let a = run_simulation(&args, TrayConfig::default()).unwrap();
        let b = run_simulation(&args, TrayConfig::default()).unwrap();
        assert_eq!(a.rolls.len(), 2);
        assert_eq!(a.total, b.total);
        for (x, y) in a.rolls.iter().zip(&b.rolls) {
            assert_eq!(x.value, y.value);
            assert_eq!(x.frames, y.frames);
            assert!((1..=20).contains(&x.value));
        }
    }

    #[test]
    fn test_load_config_default_and_missing() {
        assert_eq!(load_config(None).unwrap(), TrayConfig::default());
        assert!(load_config(Some(&PathBuf::from("/nonexistent/tray.json"))).is_err());
    }
}
