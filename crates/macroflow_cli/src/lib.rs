//! Commands behind the `macroflow` binary.
//!
//! Every command writes its report to a caller-supplied writer so the
//! binary can use stdout and tests can use a buffer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use macroflow_adapters::{DetectionSnapshot, TracingActuator};
use macroflow_core::{ConfigError, MacroflowConfig};
use macroflow_graph::hooks::ChannelSink;
use macroflow_graph::{
    Cancellation, DocumentError, Engine, Graph, NodeId, RunEvent, RunOptions, ScriptLibrary,
    Termination,
};

/// Validate, inspect and dry-run Macroflow script libraries
#[derive(Parser, Debug)]
#[command(name = "macroflow", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file with engine and logging settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check every script of a library for structural problems
    Validate {
        /// Path to the library file
        library: PathBuf,
    },

    /// List the scripts of a library, or the nodes of one script
    Show {
        /// Path to the library file
        library: PathBuf,

        /// Script to describe in detail
        #[arg(short, long)]
        script: Option<String>,
    },

    /// Run a script without touching the input devices
    Run {
        /// Path to the library file
        library: PathBuf,

        /// Script to run
        #[arg(short, long)]
        script: String,

        /// Detection snapshot to run against (JSON); defaults to no detections
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Node to start at instead of the first one
        #[arg(long)]
        start: Option<String>,

        /// Also print every run event
        #[arg(long, default_value_t = false)]
        events: bool,
    },
}

/// Errors reported by the binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// A library could not be loaded.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The snapshot file could not be read.
    #[error("cannot read snapshot {path}: {source}")]
    SnapshotIo {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file is not a detection snapshot.
    #[error("invalid snapshot {path}: {source}")]
    SnapshotJson {
        /// Snapshot path.
        path: PathBuf,
        /// Parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the report failed.
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Loads the configuration file, or the defaults when none is given.
///
/// # Errors
///
/// Returns [`CliError::Config`] if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<MacroflowConfig, CliError> {
    match path {
        Some(path) => Ok(MacroflowConfig::from_file(path)?),
        None => Ok(MacroflowConfig::default()),
    }
}

/// Reads a detection snapshot file.
///
/// # Errors
///
/// Returns a snapshot error if the file is unreadable or malformed.
pub fn load_snapshot(path: &Path) -> Result<DetectionSnapshot, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::SnapshotIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::SnapshotJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Runs a parsed command line. Returns `false` if the command found problems.
///
/// # Errors
///
/// Returns a [`CliError`] if an input file cannot be loaded or the report
/// cannot be written.
pub async fn execute(
    command: Command,
    config: &MacroflowConfig,
    cancel: Cancellation,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    match command {
        Command::Validate { library } => validate(&ScriptLibrary::load(library)?, out),
        Command::Show { library, script } => {
            show(&ScriptLibrary::load(library)?, script.as_deref(), out)?;
            Ok(true)
        }
        Command::Run {
            library,
            script,
            snapshot,
            start,
            events,
        } => {
            let library = ScriptLibrary::load(library)?;
            let graph = library
                .get(&script)
                .ok_or_else(|| DocumentError::UnknownScript(script.clone()))?;
            let snapshot = match snapshot {
                Some(path) => load_snapshot(&path)?,
                None => DetectionSnapshot::empty(),
            };
            let request = DryRun {
                graph,
                snapshot,
                start: start.as_deref(),
                events,
            };
            dry_run(request, config, cancel, out).await
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// validate
// ─────────────────────────────────────────────────────────────────────────────

/// Lints every script. Returns `true` if none has issues.
///
/// # Errors
///
/// Returns [`CliError::Output`] if writing fails.
pub fn validate(library: &ScriptLibrary, out: &mut dyn Write) -> Result<bool, CliError> {
    let mut clean = true;
    for (name, graph) in library.iter() {
        match graph.validate() {
            Ok(()) => writeln!(out, "ok    {name} ({} nodes)", graph.node_count())?,
            Err(issues) => {
                clean = false;
                writeln!(out, "FAIL  {name} ({} issues)", issues.len())?;
                for issue in issues {
                    writeln!(out, "      - {issue}")?;
                }
            }
        }
    }
    if library.is_empty() {
        writeln!(out, "library has no scripts")?;
    }
    Ok(clean)
}

// ─────────────────────────────────────────────────────────────────────────────
// show
// ─────────────────────────────────────────────────────────────────────────────

/// Lists the scripts, or describes one script node by node.
///
/// # Errors
///
/// Returns [`DocumentError::UnknownScript`] for a missing script and
/// [`CliError::Output`] if writing fails.
pub fn show(library: &ScriptLibrary, script: Option<&str>, out: &mut dyn Write) -> Result<(), CliError> {
    let Some(name) = script else {
        writeln!(out, "library version {}", library.version())?;
        for (name, graph) in library.iter() {
            writeln!(
                out,
                "  {name:<24} id={:<16} nodes={:<4} connections={}",
                graph.id,
                graph.node_count(),
                graph.connections.len()
            )?;
        }
        return Ok(());
    };

    let graph = library
        .get(name)
        .ok_or_else(|| DocumentError::UnknownScript(name.to_string()))?;
    describe(graph, out)
}

fn describe(graph: &Graph, out: &mut dyn Write) -> Result<(), CliError> {
    writeln!(out, "{} ({})", graph.display_name(), graph.id)?;
    for node in graph.nodes() {
        let next = graph
            .successor(&node.id)
            .map_or_else(|| "-".to_string(), ToString::to_string);
        write!(out, "  {:<16} {:<20} -> {next}", node.id.as_str(), node.kind.as_str())?;
        for (param, target) in node.branch_targets() {
            write!(out, "  {param}={target}")?;
        }
        if let Some(comment) = &node.comment {
            write!(out, "  # {comment}")?;
        }
        writeln!(out)?;
    }
    for (group, members) in &graph.groups {
        let members: Vec<&str> = members.iter().map(NodeId::as_str).collect();
        writeln!(out, "  group {group}: {}", members.join(", "))?;
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// run
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs of a dry run.
#[derive(Debug)]
pub struct DryRun<'a> {
    /// Script to run.
    pub graph: &'a Graph,
    /// Detections every node sees.
    pub snapshot: DetectionSnapshot,
    /// Optional start node.
    pub start: Option<&'a str>,
    /// Print every event, not just the summary.
    pub events: bool,
}

/// Runs a script with a logging actuator. Returns `true` unless the run
/// ended on a fatal condition.
///
/// # Errors
///
/// Returns [`CliError::Config`] for an invalid engine section and
/// [`CliError::Output`] if writing fails.
pub async fn dry_run(
    request: DryRun<'_>,
    config: &MacroflowConfig,
    cancel: Cancellation,
    out: &mut dyn Write,
) -> Result<bool, CliError> {
    let mut engine = Engine::new(Arc::new(TracingActuator)).with_config(config.engine_config()?);
    let (sink, mut receiver) = ChannelSink::channel();

    let mut options = RunOptions::new().cancel_when(cancel).observe(&sink);
    if let Some(start) = request.start {
        options = options.start_at(start);
    }
    let result = engine.execute(request.graph, request.snapshot, options).await;

    let mut executed = Vec::new();
    let mut finished = None;
    while let Ok(event) = receiver.try_recv() {
        if request.events {
            writeln!(out, "event: {event:?}")?;
        }
        match event {
            RunEvent::AboutToExecute { node_id } => executed.push(node_id.to_string()),
            RunEvent::Finished {
                termination, steps, ..
            } => finished = Some((termination, steps)),
            _ => {}
        }
    }

    writeln!(out, "executed: {}", executed.join(" -> "))?;
    let (termination, steps) = finished.unwrap_or((Termination::FailedStart, 0));
    writeln!(out, "termination: {termination} ({steps} steps)")?;
    match result {
        Ok(report) => {
            writeln!(out, "duration: {:?}", report.duration)?;
            Ok(true)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroflow_adapters::{BBox, Detection};
    use macroflow_graph::{Node, NodeKind};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    fn library() -> ScriptLibrary {
        let mut library = ScriptLibrary::new();
        let mut accept = Graph::new("s1", "accept");
        accept
            .add_node(
                Node::new("check", NodeKind::Condition)
                    .with_param("label", "OK")
                    .with_param("next_true", "press")
                    .with_param("next_false", "rest"),
            )
            .add_node(Node::new("press", NodeKind::Click).with_param("label", "OK"))
            .add_node(Node::new("rest", NodeKind::Sleep).with_param("seconds", 0.0))
            .group("main", "check");
        library.insert(accept);

        let mut broken = Graph::new("s2", "broken");
        broken
            .add_node(Node::new("a", NodeKind::Sleep).with_param("seconds", 0.0))
            .connect("a", "ghost");
        library.insert(broken);
        library
    }

    fn text(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn validate_reports_each_script() {
        let mut out = Vec::new();
        let clean = validate(&library(), &mut out).unwrap();
        let report = text(out);
        assert!(!clean);
        assert!(report.contains("ok    accept (3 nodes)"));
        assert!(report.contains("FAIL  broken (1 issues)"));
        assert!(report.contains("connection a -> ghost targets a missing node"));
    }

    #[test]
    fn show_lists_and_describes() {
        let mut out = Vec::new();
        show(&library(), None, &mut out).unwrap();
        let listing = text(out);
        assert!(listing.starts_with("library version 1.0"));
        assert!(listing.contains("accept"));
        assert!(listing.contains("broken"));

        let mut out = Vec::new();
        show(&library(), Some("accept"), &mut out).unwrap();
        let detail = text(out);
        assert!(detail.contains("next_true=press"));
        assert!(detail.contains("group main: check"));

        let err = show(&library(), Some("nope"), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, CliError::Document(DocumentError::UnknownScript(_))));
    }

    #[tokio::test]
    async fn dry_run_prints_path_and_termination() {
        let library = library();
        let snapshot = DetectionSnapshot::new(vec![Detection::new("OK", BBox::new(0, 0, 10, 10), 0.9)]);
        let request = DryRun {
            graph: library.get("accept").unwrap(),
            snapshot,
            start: None,
            events: false,
        };
        let mut out = Vec::new();
        let ok = dry_run(request, &MacroflowConfig::default(), Cancellation::never(), &mut out)
            .await
            .unwrap();
        let report = text(out);
        assert!(ok);
        assert!(report.contains("executed: check -> press"));
        assert!(report.contains("termination: completed (2 steps)"));
    }

    #[tokio::test]
    async fn dry_run_reports_fatal_terminations() {
        let library = library();
        let request = DryRun {
            graph: library.get("broken").unwrap(),
            snapshot: DetectionSnapshot::empty(),
            start: None,
            events: true,
        };
        let mut out = Vec::new();
        let ok = dry_run(request, &MacroflowConfig::default(), Cancellation::never(), &mut out)
            .await
            .unwrap();
        let report = text(out);
        assert!(!ok);
        assert!(report.contains("termination: dangling-node (1 steps)"));
        assert!(report.contains("error: node not found: ghost"));
        assert!(report.contains("event: "));
    }

    #[tokio::test]
    async fn dry_run_stops_a_long_sleep_when_interrupted() {
        let mut graph = Graph::new("s3", "long");
        graph
            .add_node(Node::new("wait", NodeKind::Sleep).with_param("seconds", 30.0))
            .add_node(Node::new("after", NodeKind::Key).with_param("key", "enter"))
            .connect("wait", "after");
        let request = DryRun {
            graph: &graph,
            snapshot: DetectionSnapshot::empty(),
            start: None,
            events: false,
        };

        let interrupted = Arc::new(AtomicBool::new(false));
        let setter = {
            let interrupted = interrupted.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                interrupted.store(true, Ordering::SeqCst);
            })
        };

        let started = Instant::now();
        let mut out = Vec::new();
        let ok = dry_run(
            request,
            &MacroflowConfig::default(),
            Cancellation::from_flag(interrupted),
            &mut out,
        )
        .await
        .unwrap();
        setter.await.unwrap();

        let report = text(out);
        assert!(ok);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(report.contains("executed: wait\n"));
        assert!(report.contains("termination: cancelled (1 steps)"));
    }

    #[test]
    fn cli_parses_run_arguments() {
        let cli = Cli::try_parse_from([
            "macroflow",
            "run",
            "lib.json",
            "--script",
            "accept",
            "--start",
            "press",
            "--config",
            "cfg.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cfg.json")));
        match cli.command {
            Command::Run { script, start, events, .. } => {
                assert_eq!(script, "accept");
                assert_eq!(start.as_deref(), Some("press"));
                assert!(!events);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn missing_snapshot_file_is_reported() {
        let err = load_snapshot(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, CliError::SnapshotIo { .. }));
    }
}
