//! mimo-worker, the six worker templates (`Importer`, `Exporter`,
//! `Processor`, `Filter`, `Observer`, `IsAlive`) that user pipeline stages
//! are built from, plus the `BufferIO` bundle and configuration surface
//! they're constructed with.
//!
//! Every template enforces its source/sink/observe arity at construction,
//! not at run time: a misconfigured pipeline fails fast with a
//! `WorkerError` before any user code runs.

mod binlog;
mod buffer_io;
mod config;
mod error;
mod templates;
mod warn_once;

pub use binlog::BinLogHeader;
pub use buffer_io::BufferIO;
pub use config::Config;
pub use error::WorkerError;
pub use templates::{Exporter, Filter, ImportOutcome, Importer, IsAlive, Keep, Observer, Processor, Sample};
pub use warn_once::WarnOnce;
