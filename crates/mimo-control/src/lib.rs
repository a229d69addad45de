//! Pipeline orchestration: validates the buffer/worker graph, spawns worker
//! process groups, fans their output into one log stream, and runs a
//! control loop that publishes stats and applies operator commands.

pub mod control_loop;
pub mod error;
pub mod print_fanin;
pub mod setup;
pub mod telemetry;
pub mod topology;
pub mod worker_group;

pub use control_loop::{ControlCommand, ControlLoop, StatsSnapshot};
pub use error::ControlError;
pub use print_fanin::{run_consumer, PrintMessage, PrintSender, Stream};
pub use setup::{BufferSpec, RunLayout, RunOptions, WorkerSpec};
pub use telemetry::{read_cpu_percent, DynBuffer, NamedBuffer, WorkerTelemetry};
pub use topology::{FunctionSpec, Topology, TopologyError};
pub use worker_group::WorkerGroup;
