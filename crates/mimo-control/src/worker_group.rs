//! `WorkerGroup`: a named function's pool of OS processes. Each process is
//! a re-exec of the current binary with an environment-variable-encoded
//! role selector, so the embedder supplies one executable and this crate
//! tells each child which worker template and buffer set to run.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::print_fanin::{PrintSender, Stream};

/// One running (or recently running) worker process pool.
pub struct WorkerGroup {
    name: String,
    children: Vec<Child>,
}

impl WorkerGroup {
    /// Spawns `process_count` copies of `program`, each with the
    /// environment variables `envs(index)` set, piping stdout/stderr lines
    /// into `print_tx`.
    pub fn spawn(
        name: impl Into<String>,
        program: &Path,
        process_count: usize,
        envs: impl Fn(usize) -> Vec<(String, String)>,
        print_tx: &PrintSender,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let mut children = Vec::with_capacity(process_count);

        for index in 0..process_count {
            let mut command = Command::new(program);
            command.envs(envs(index));
            command.stdout(Stdio::piped());
            command.stderr(Stdio::piped());

            let mut child = command.spawn()?;
            let worker_label = format!("{name}_{index}");

            if let Some(stdout) = child.stdout.take() {
                spawn_line_reader(worker_label.clone(), stdout, Stream::Stdout, print_tx.clone());
            }
            if let Some(stderr) = child.stderr.take() {
                spawn_line_reader(worker_label, stderr, Stream::Stderr, print_tx.clone());
            }

            children.push(child);
        }

        Ok(Self { name, children })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of processes still running, per a non-blocking `try_wait` on
    /// each child.
    pub fn alive_processes(&mut self) -> usize {
        self.children
            .iter_mut()
            .filter(|child| matches!(child.try_wait(), Ok(None)))
            .count()
    }

    /// Force-terminates every process in this group, optionally waiting up
    /// to `grace` first for processes to exit on their own (e.g. after the
    /// caller has already sent a flush event to this group's sources).
    pub fn shutdown(&mut self, grace: Option<Duration>) {
        if let Some(grace) = grace {
            let deadline = std::time::Instant::now() + grace;
            while std::time::Instant::now() < deadline {
                if self.alive_processes() == 0 {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        }

        for child in &mut self.children {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

fn spawn_line_reader<R: std::io::Read + Send + 'static>(worker: String, reader: R, stream: Stream, tx: PrintSender) {
    thread::spawn(move || {
        let buffered = BufReader::new(reader);
        for line in buffered.lines() {
            let Ok(line) = line else { break };
            if tx
                .send(crate::print_fanin::PrintMessage {
                    worker: worker.clone(),
                    stream,
                    line,
                })
                .is_err()
            {
                break;
            }
        }
    });
}
