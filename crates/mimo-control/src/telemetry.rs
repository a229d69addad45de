//! Buffer and worker telemetry, type-erased so the control loop can hold a
//! heterogeneous set of buffers (each `SlotBuffer<E, L>` is a distinct
//! monomorphization) behind one object-safe interface.

use std::sync::Arc;

use mimo_ring::{BufferStats, SlotBuffer, SlotElement};

/// Object-safe view over a named `SlotBuffer<E, L>`, erasing its element
/// schema so the control loop can treat every buffer in a pipeline
/// uniformly.
pub trait DynBuffer: Send + Sync {
    fn name(&self) -> &str;
    fn stats(&self) -> BufferStats;
    fn pause(&self);
    fn resume(&self);
    fn send_flush_event(&self);
}

pub struct NamedBuffer<E: SlotElement, const L: usize> {
    name: String,
    buffer: Arc<SlotBuffer<E, L>>,
}

impl<E: SlotElement, const L: usize> NamedBuffer<E, L> {
    #[must_use]
    pub fn new(name: impl Into<String>, buffer: Arc<SlotBuffer<E, L>>) -> Self {
        Self { name: name.into(), buffer }
    }
}

impl<E: SlotElement, const L: usize> DynBuffer for NamedBuffer<E, L> {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> BufferStats {
        self.buffer.get_stats()
    }

    fn pause(&self) {
        self.buffer.pause();
    }

    fn resume(&self) {
        self.buffer.resume();
    }

    fn send_flush_event(&self) {
        self.buffer.send_flush_event();
    }
}

/// Liveness/resource telemetry for one worker group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerTelemetry {
    pub alive_count: usize,
    /// Best-effort CPU usage sum across the group's processes; `0.0` on
    /// platforms without a `/proc/<pid>/stat` to read, since porting the
    /// original's CPU accounting in full is out of scope here.
    pub cpu_percent: f32,
}

/// Reads a process's CPU time fields from `/proc/<pid>/stat` on Linux.
/// Returns `0.0` everywhere else, or if the process has already exited.
#[must_use]
pub fn read_cpu_percent(pid: u32) -> f32 {
    #[cfg(target_os = "linux")]
    {
        let Ok(contents) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
            return 0.0;
        };
        parse_utime_stime_ticks(&contents).unwrap_or(0.0)
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        0.0
    }
}

#[cfg(target_os = "linux")]
fn parse_utime_stime_ticks(stat_line: &str) -> Option<f32> {
    // Fields 14 (utime) and 15 (stime) come after the process name, which
    // may itself contain spaces and is parenthesized; split after the
    // closing paren to avoid misparsing on an unusual command name.
    let after_comm = stat_line.rsplit_once(')')?.1;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();
    let utime: f32 = fields.get(11)?.parse().ok()?;
    let stime: f32 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}
