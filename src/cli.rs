use crate::engine::UploadSimulator;
use crate::model::{Category, FileDescriptor, SimConfig, UploadEvent, UploadRecord};
use crate::views::{self, StatusCounts};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
#[derive(Debug)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
///
/// Stderr is shared with the tracing subscriber, so it is locked per line only.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(stdout.lock(), "{msg}");
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(stderr.lock(), "{msg}");
                }
            }
        }

        let _ = stdout.lock().flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "agri-upload-sim",
    version,
    about = "Data upload center for multispectral images and sensor files, with simulated uploads"
)]
pub struct Cli {
    /// Files to upload at launch (TIFF/PNG images, CSV/JSON sensor data; anything is accepted)
    #[arg(value_name = "FILES")]
    pub files: Vec<std::path::PathBuf>,

    /// Upload a file that doesn't exist locally, given as NAME:SIZE:MIME (repeatable)
    #[arg(long, value_name = "NAME:SIZE:MIME")]
    pub synthetic: Vec<String>,

    /// Interval between progress ticks of each upload
    #[arg(long, default_value = "500ms")]
    pub tick_interval: humantime::Duration,

    /// Upper bound (exclusive) of the progress added per tick, in percent
    #[arg(long, default_value_t = 20.0)]
    pub max_increment: f64,

    /// Probability that an upload ends in error
    #[arg(long, default_value_t = 0.1)]
    pub failure_rate: f64,

    /// Seed the simulation for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the settled uploads as JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Stream upload progress as text and exit once every upload settled (no TUI)
    #[arg(long)]
    pub text: bool,
}

impl Cli {
    /// Reject argument combinations the simulator can't honour.
    pub fn validate(&self) -> Result<()> {
        if self.json && self.text {
            anyhow::bail!("--json and --text are mutually exclusive");
        }
        if !(0.0..=1.0).contains(&self.failure_rate) {
            anyhow::bail!(
                "--failure-rate must be between 0 and 1, got {}",
                self.failure_rate
            );
        }
        if !(self.max_increment.is_finite() && self.max_increment > 0.0) {
            anyhow::bail!(
                "--max-increment must be a positive number, got {}",
                self.max_increment
            );
        }
        if Duration::from(self.tick_interval).is_zero() {
            anyhow::bail!("--tick-interval must be greater than zero");
        }
        Ok(())
    }
}

pub async fn run(args: Cli) -> Result<()> {
    args.validate()?;

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Build a `SimConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> SimConfig {
    SimConfig {
        tick_interval: Duration::from(args.tick_interval),
        max_increment: args.max_increment,
        failure_rate: args.failure_rate,
        seed: args.seed,
    }
}

/// Describe every file named on the command line, paths first, then synthetic descriptors.
pub fn initial_files(args: &Cli) -> Result<Vec<FileDescriptor>> {
    let mut files: Vec<FileDescriptor> = args
        .files
        .iter()
        .map(|p| crate::intake::describe_path(p))
        .collect();
    for raw in &args.synthetic {
        let d = crate::intake::parse_synthetic(raw)
            .with_context(|| format!("invalid --synthetic value '{raw}'"))?;
        files.push(d);
    }
    Ok(files)
}

fn require_files(args: &Cli) -> Result<Vec<FileDescriptor>> {
    let files = initial_files(args)?;
    if files.is_empty() {
        anyhow::bail!("nothing to upload: pass FILES or --synthetic NAME:SIZE:MIME");
    }
    Ok(files)
}

/// Final JSON document printed by `--json`.
#[derive(Debug, Serialize)]
struct JsonReport {
    config: SimConfig,
    records: Vec<UploadRecord>,
    images: usize,
    sensor: usize,
    completed: usize,
    error: usize,
    uploading: usize,
    pipeline_active: bool,
}

impl JsonReport {
    fn new(config: SimConfig, sim: &UploadSimulator) -> Self {
        let records = sim.records();
        let counts = StatusCounts::from_records(&records);
        Self {
            config,
            images: sim.by_category(Category::Image).len(),
            sensor: sim.by_category(Category::Sensor).len(),
            completed: counts.completed,
            error: counts.error,
            uploading: counts.uploading,
            pipeline_active: sim.has_completed(),
            records,
        }
    }
}

async fn run_json(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let files = require_files(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();

    // JSON mode only needs the final state; events are discarded.
    let (evt_tx, _) = mpsc::unbounded_channel::<UploadEvent>();
    let sim = UploadSimulator::from_config(&cfg, evt_tx);
    sim.submit_batch(files);

    tokio::select! {
        _ = sim.wait_settled() => {}
        res = tokio::signal::ctrl_c() => {
            res.context("listen for ctrl-c")?;
            sim.shutdown();
        }
    }

    let report = JsonReport::new(cfg, &sim);
    let out = serde_json::to_string_pretty(&report)?;
    let _ = out_tx.send(OutputLine::Stdout(out));

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

fn describe_event(sim: &UploadSimulator, ev: &UploadEvent) -> String {
    match ev {
        UploadEvent::Submitted { record } => format!(
            "{} submitted {} ({}, {}, {})",
            record.id,
            record.name,
            record.category.label(),
            record.mime_type,
            views::format_file_size(record.size_bytes)
        ),
        UploadEvent::Progress { id, progress } => format!("{id} uploading… {progress:.0}%"),
        UploadEvent::Finished { id, status } => {
            let name = sim.get(id).map(|r| r.name).unwrap_or_default();
            format!("{id} {} {name}", status.label())
                .trim_end()
                .to_string()
        }
        UploadEvent::Removed { id } => format!("{id} removed"),
        UploadEvent::Info(msg) => msg.clone(),
    }
}

/// Print simulator events until `expected` uploads reached a terminal state
/// or were removed, or until `interrupt` fires.
async fn stream_until_settled<F>(
    sim: &UploadSimulator,
    evt_rx: &mut mpsc::UnboundedReceiver<UploadEvent>,
    out: &mpsc::UnboundedSender<OutputLine>,
    expected: usize,
    interrupt: F,
) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::pin!(interrupt);
    let mut settled = 0;

    while settled < expected {
        tokio::select! {
            ev = evt_rx.recv() => {
                let Some(ev) = ev else { break };
                if matches!(ev, UploadEvent::Finished { .. } | UploadEvent::Removed { .. }) {
                    settled += 1;
                }
                let _ = out.send(OutputLine::Stderr(describe_event(sim, &ev)));
            }
            res = &mut interrupt => {
                res.context("listen for ctrl-c")?;
                sim.shutdown();
                // Events emitted before the tickers stopped are still queued.
                while let Ok(ev) = evt_rx.try_recv() {
                    let _ = out.send(OutputLine::Stderr(describe_event(sim, &ev)));
                }
                let _ = out.send(OutputLine::Stderr("Interrupted".into()));
                break;
            }
        }
    }
    Ok(())
}

async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let files = require_files(&args)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<UploadEvent>();

    let sim = UploadSimulator::from_config(&cfg, evt_tx);
    for name in files
        .iter()
        .filter(|f| !crate::mime::matches_accept_hint(&f.name))
        .map(|f| f.name.as_str())
    {
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Accepting {name} (not TIFF/PNG/CSV/JSON)"
        )));
    }
    sim.submit_batch(files);

    let res = stream_until_settled(
        &sim,
        &mut evt_rx,
        &out_tx,
        sim.len(),
        tokio::signal::ctrl_c(),
    )
    .await;

    if res.is_ok() {
        let summary = crate::text_summary::build_text_summary(&sim);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("agri-upload-sim").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_reference_schedule() {
        let args = parse(&[]);
        args.validate().unwrap();
        let cfg = build_config(&args);
        assert_eq!(cfg.tick_interval, Duration::from_millis(500));
        assert_eq!(cfg.max_increment, 20.0);
        assert_eq!(cfg.failure_rate, 0.1);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--json", "--text"]).validate().is_err());
        assert!(parse(&["--failure-rate", "1.5"]).validate().is_err());
        assert!(parse(&["--max-increment", "0"]).validate().is_err());
        assert!(parse(&["--tick-interval", "0s"]).validate().is_err());
        assert!(parse(&["--failure-rate", "1", "--tick-interval", "10ms"])
            .validate()
            .is_ok());
    }

    #[test]
    fn initial_files_merge_paths_and_synthetic() {
        let args = parse(&[
            "/nowhere/field.tif",
            "--synthetic",
            "scan.png:2048:image/png",
            "--synthetic",
            "sensor.csv:10:text/csv",
        ]);
        let files = initial_files(&args).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["field.tif", "scan.png", "sensor.csv"]);
        assert_eq!(files[0].mime_type, "image/tiff");
    }

    #[test]
    fn bad_synthetic_is_reported_with_context() {
        let args = parse(&["--synthetic", "scan.png"]);
        let err = initial_files(&args).unwrap_err();
        assert!(format!("{err:#}").contains("invalid --synthetic value 'scan.png'"));
    }

    #[test]
    fn empty_invocation_has_nothing_to_upload() {
        assert!(require_files(&parse(&["--text"])).is_err());
    }

    fn synthetic_batch(n: usize) -> Vec<FileDescriptor> {
        (0..n)
            .map(|i| FileDescriptor::new(format!("plot-{i}.csv"), 10, "text/csv"))
            .collect()
    }

    fn fast_config(seed: u64) -> SimConfig {
        SimConfig {
            tick_interval: Duration::from_millis(10),
            max_increment: 100_000.0,
            seed: Some(seed),
            ..SimConfig::default()
        }
    }

    fn stderr_lines(rx: &mut mpsc::UnboundedReceiver<OutputLine>) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = rx.try_recv() {
            if let OutputLine::Stderr(msg) = line {
                lines.push(msg);
            }
        }
        lines
    }

    fn finish_lines(lines: &[String]) -> usize {
        lines
            .iter()
            .filter(|l| l.contains(" completed ") || l.contains(" error "))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn text_stream_prints_every_finish_even_when_read_late() {
        for seed in 1..=3 {
            let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
            let sim = UploadSimulator::from_config(&fast_config(seed), evt_tx);
            sim.submit_batch(synthetic_batch(3));
            // Every upload settles before the stream is read at all.
            sim.wait_settled().await;

            let (out_tx, mut out_rx) = mpsc::unbounded_channel();
            stream_until_settled(
                &sim,
                &mut evt_rx,
                &out_tx,
                sim.len(),
                std::future::pending::<std::io::Result<()>>(),
            )
            .await
            .unwrap();

            let lines = stderr_lines(&mut out_rx);
            assert_eq!(finish_lines(&lines), 3, "seed {seed}: {lines:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_stops_tickers_and_flushes_queued_events() {
        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let sim = UploadSimulator::from_config(&SimConfig::default(), evt_tx);
        sim.submit_batch(synthetic_batch(2));

        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        stream_until_settled(
            &sim,
            &mut evt_rx,
            &out_tx,
            sim.len(),
            std::future::ready(Ok(())),
        )
        .await
        .unwrap();

        let lines = stderr_lines(&mut out_rx);
        assert_eq!(lines.iter().filter(|l| l.contains(" submitted ")).count(), 2);
        assert_eq!(lines.last().map(String::as_str), Some("Interrupted"));
        assert_eq!(sim.in_flight(), 2);

        // Nothing moves after the interrupt.
        tokio::time::advance(Duration::from_secs(5)).await;
        tokio::task::yield_now().await;
        assert!(sim.records().iter().all(|r| r.progress == 0.0));
    }

    // Real clock: the writer runs on the blocking pool, which holds a paused clock still.
    #[tokio::test]
    async fn debug_logging_does_not_stall_text_output() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_writer(std::io::stderr)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (out_tx, out_handle) = spawn_output_writer();
        let _ = out_tx.send(OutputLine::Stderr("debug logging run".into()));

        let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
        let sim = UploadSimulator::from_config(&fast_config(4), evt_tx);
        sim.submit_batch(synthetic_batch(2));
        stream_until_settled(
            &sim,
            &mut evt_rx,
            &out_tx,
            sim.len(),
            std::future::pending::<std::io::Result<()>>(),
        )
        .await
        .unwrap();

        drop(out_tx);
        out_handle.await.unwrap();
        assert_eq!(sim.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn json_report_counts_categories_and_outcomes() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let cfg = SimConfig {
            failure_rate: 0.0,
            ..fast_config(7)
        };
        let sim = UploadSimulator::from_config(&cfg, tx);
        sim.submit_batch(vec![
            FileDescriptor::new("scan.png", 2048, "image/png"),
            FileDescriptor::new("sensor.csv", 512, "text/csv"),
            FileDescriptor::new("probe.json", 64, "application/json"),
        ]);
        sim.wait_settled().await;

        let v = serde_json::to_value(JsonReport::new(cfg, &sim)).unwrap();
        assert_eq!(v["images"], 1);
        assert_eq!(v["sensor"], 2);
        assert_eq!(v["completed"], 3);
        assert_eq!(v["error"], 0);
        assert_eq!(v["uploading"], 0);
        assert_eq!(v["pipeline_active"], true);
        assert_eq!(v["records"][0]["name"], "scan.png");
        assert_eq!(v["records"][0]["status"], "completed");
    }

    #[tokio::test]
    async fn finished_event_line() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sim = UploadSimulator::from_config(&SimConfig::default(), tx);
        let line = describe_event(
            &sim,
            &UploadEvent::Finished {
                id: crate::model::RecordId::new("abc"),
                status: crate::model::UploadStatus::Error,
            },
        );
        assert_eq!(line, "abc error");
    }
}
