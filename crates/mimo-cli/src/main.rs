//! Demo operator binary: wires `mimo-ring`/`mimo-worker`/`mimo-control`
//! into a runnable three-stage pipeline (Importer -> Filter -> Exporter)
//! and drives it through the control loop for a few seconds.
//!
//! This binary re-execs itself as each worker process, with the role and
//! buffer names passed through environment variables, rather than parsing
//! an external setup file: building the graph in code keeps this crate a
//! thin consumer of the three library crates.

use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use mimo_control::{ControlCommand, ControlLoop, DynBuffer, FunctionSpec, NamedBuffer, Topology, WorkerGroup};
use mimo_ring::{BufferConfig, SlotBuffer};
use mimo_worker::{BufferIO, Config, Exporter, Filter, ImportOutcome, Importer, Keep};

const ROLE_ENV: &str = "MIMO_ROLE";
const RAW_BUFFER_ENV: &str = "MIMO_RAW_BUFFER";
const FILTERED_BUFFER_ENV: &str = "MIMO_FILTERED_BUFFER";
const SLOT_COUNT_ENV: &str = "MIMO_SLOT_COUNT";
const EVENT_LIMIT_ENV: &str = "MIMO_EVENT_LIMIT";

const RAW_BUFFER_NAME: &str = "mimo-cli-demo-raw";
const FILTERED_BUFFER_NAME: &str = "mimo-cli-demo-filtered";
const SLOT_COUNT: usize = 16;
const EVENT_LIMIT: usize = 200;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    if let Ok(role) = env::var(ROLE_ENV) {
        return run_worker(&role);
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run_orchestrator())
}

/// Entry point for a re-exec'd child process: attaches to the already
/// created shared-memory buffers by name and runs the requested template.
fn run_worker(role: &str) -> Result<()> {
    let slot_count: usize = env::var(SLOT_COUNT_ENV).ok().and_then(|v| v.parse().ok()).unwrap_or(SLOT_COUNT);
    let raw_name = env::var(RAW_BUFFER_ENV).unwrap_or_else(|_| RAW_BUFFER_NAME.to_owned());
    let filtered_name = env::var(FILTERED_BUFFER_ENV).unwrap_or_else(|_| FILTERED_BUFFER_NAME.to_owned());
    let run_directory = PathBuf::from("/tmp");

    match role {
        "importer" => {
            let sink = Arc::new(SlotBuffer::<f64, 1>::attach(&raw_name, slot_count)?);
            let io = BufferIO::new("importer", vec![], vec![sink], vec![], Config::new(), run_directory);
            let importer = Importer::new(io)?;
            let produced = AtomicUsize::new(0);
            importer.run(
                || {
                    let n = produced.fetch_add(1, Ordering::Relaxed);
                    if n >= EVENT_LIMIT {
                        ImportOutcome::Exhausted
                    } else {
                        ImportOutcome::Produced([n as f64])
                    }
                },
                || false,
            )?;
        }
        "filter" => {
            let source = Arc::new(SlotBuffer::<f64, 1>::attach(&raw_name, slot_count)?);
            let sink = Arc::new(SlotBuffer::<f64, 1>::attach(&filtered_name, slot_count)?);
            let io = BufferIO::new("filter", vec![source], vec![sink], vec![], Config::new(), run_directory);
            let filter = Filter::new(io)?;
            filter.run(|_metadata, data| Keep::All((data[0] as i64) % 2 == 0))?;
        }
        "exporter" => {
            let source = Arc::new(SlotBuffer::<f64, 1>::attach(&filtered_name, slot_count)?);
            let io = BufferIO::new("exporter", vec![source], vec![], vec![], Config::new(), run_directory);
            let exporter = Exporter::new(io)?;
            exporter.run(|metadata, data| {
                tracing::info!(counter = metadata.counter, value = data[0], "exported event");
            })?;
        }
        other => anyhow::bail!("unknown worker role {other:?}"),
    }

    Ok(())
}

async fn run_orchestrator() -> Result<()> {
    let functions = vec![
        FunctionSpec {
            name: "importer".to_owned(),
            sources: vec![],
            sinks: vec![RAW_BUFFER_NAME.to_owned()],
            observes: vec![],
        },
        FunctionSpec {
            name: "filter".to_owned(),
            sources: vec![RAW_BUFFER_NAME.to_owned()],
            sinks: vec![FILTERED_BUFFER_NAME.to_owned()],
            observes: vec![],
        },
        FunctionSpec {
            name: "exporter".to_owned(),
            sources: vec![FILTERED_BUFFER_NAME.to_owned()],
            sinks: vec![],
            observes: vec![],
        },
    ];
    let buffer_names = vec![RAW_BUFFER_NAME.to_owned(), FILTERED_BUFFER_NAME.to_owned()];
    let root = Topology::validate_arborescence(&buffer_names, &functions).context("invalid pipeline topology")?;
    tracing::info!(root, "topology validated");

    let raw_buffer = Arc::new(SlotBuffer::<f64, 1>::create(RAW_BUFFER_NAME, BufferConfig::new(SLOT_COUNT, true))?);
    let filtered_buffer = Arc::new(SlotBuffer::<f64, 1>::create(FILTERED_BUFFER_NAME, BufferConfig::new(SLOT_COUNT, true))?);

    let buffers: Vec<Box<dyn DynBuffer>> = vec![
        Box::new(NamedBuffer::new(RAW_BUFFER_NAME, raw_buffer.clone())),
        Box::new(NamedBuffer::new(FILTERED_BUFFER_NAME, filtered_buffer.clone())),
    ];

    let (print_tx, print_rx) = mimo_control::print_fanin::channel();
    let print_consumer = tokio::spawn(mimo_control::run_consumer(print_rx));

    let program = env::current_exe().context("resolving current executable path")?;
    let envs_for = |role: &'static str| {
        let role = role.to_owned();
        move |_index: usize| {
            vec![
                (ROLE_ENV.to_owned(), role.clone()),
                (RAW_BUFFER_ENV.to_owned(), RAW_BUFFER_NAME.to_owned()),
                (FILTERED_BUFFER_ENV.to_owned(), FILTERED_BUFFER_NAME.to_owned()),
                (SLOT_COUNT_ENV.to_owned(), SLOT_COUNT.to_string()),
                (EVENT_LIMIT_ENV.to_owned(), EVENT_LIMIT.to_string()),
            ]
        }
    };

    let groups = vec![
        WorkerGroup::spawn("importer", &program, 1, envs_for("importer"), &print_tx)?,
        WorkerGroup::spawn("filter", &program, 1, envs_for("filter"), &print_tx)?,
        WorkerGroup::spawn("exporter", &program, 1, envs_for("exporter"), &print_tx)?,
    ];
    drop(print_tx);

    let (control_loop, mut stats_rx) = ControlLoop::new(buffers, groups, Duration::from_millis(500));
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let loop_handle = tokio::spawn(control_loop.run(command_rx, shutdown_rx));

    tokio::time::sleep(Duration::from_secs(3)).await;
    if stats_rx.changed().await.is_ok() {
        let snapshot = stats_rx.borrow().clone();
        for (name, stats) in &snapshot {
            tracing::info!(buffer = name, events = stats.event_count, rate_hz = stats.event_rate_hz, "buffer stats");
        }
    }

    command_tx
        .send(ControlCommand::Shutdown { grace: Some(Duration::from_secs(2)) })
        .context("sending shutdown command")?;
    drop(shutdown_tx);
    let _ = loop_handle.await;
    let _ = print_consumer.await;

    Ok(())
}
