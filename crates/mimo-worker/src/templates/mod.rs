mod common;
mod exporter;
mod filter;
mod importer;
mod is_alive;
mod observer;
mod processor;

pub use exporter::Exporter;
pub use filter::{Filter, Keep};
pub use importer::{ImportOutcome, Importer};
pub use is_alive::IsAlive;
pub use observer::{Observer, Sample};
pub use processor::Processor;
