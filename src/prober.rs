use crate::clock::Clock;
use crate::config::{ProbeConfig, RECEIVE_BUFFER_SIZE};
use crate::error::{ProbeError, Result};
use crate::messages::{ProbeResult, RunSummary};
use crate::packet::{build_probe, process_identifier};
use crate::parser::classify;
use crate::transport::Transport;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use std::{process, thread};
use tracing::{debug, warn};

/// Called by the timeout watcher when a probe got no answer in time.
pub trait Terminator: Send + Sync {
    fn terminate(&self);
}

/// Reports the timeout and ends the process on the spot.
///
/// The blocked receive cannot be interrupted, so this is the only way out.
pub struct ExitProcess;

impl Terminator for ExitProcess {
    fn terminate(&self) {
        println!("{}", ProbeError::Timeout);
        process::exit(i32::from(ProbeError::Timeout.exit_code()));
    }
}

/// Races one in-flight probe against its timeout.
///
/// Whoever flips `settled` first wins: the receive path or the watcher thread.
struct TimeoutWatch {
    settled: Arc<AtomicBool>,
}

impl TimeoutWatch {
    fn arm(timeout: Duration, terminator: Arc<dyn Terminator>) -> TimeoutWatch {
        let settled = Arc::new(AtomicBool::new(false));
        let watcher_flag = Arc::clone(&settled);
        thread::spawn(move || {
            thread::sleep(timeout);
            if !watcher_flag.swap(true, Ordering::AcqRel) {
                warn!(?timeout, "no reply before timeout");
                terminator.terminate();
            }
        });
        TimeoutWatch { settled }
    }

    /// Marks the probe answered. Returns false if the watcher fired first.
    fn complete(&self) -> bool {
        !self.settled.swap(true, Ordering::AcqRel)
    }
}

/// Sends the configured number of probes to one destination, one at a time.
pub struct Prober<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    terminator: Arc<dyn Terminator>,
    config: ProbeConfig,
    destination: Ipv4Addr,
    identifier: u16,
}

impl<T: Transport, C: Clock> Prober<T, C> {
    pub fn new(
        transport: T,
        clock: C,
        terminator: Arc<dyn Terminator>,
        config: ProbeConfig,
        destination: Ipv4Addr,
    ) -> Prober<T, C> {
        Prober {
            transport,
            clock,
            terminator,
            config,
            destination,
            identifier: process_identifier(),
        }
    }

    pub fn with_identifier(mut self, identifier: u16) -> Prober<T, C> {
        self.identifier = identifier;
        self
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    /// Runs every probe in order, handing each result to `on_result` as it
    /// arrives. The first failure ends the run and no summary is produced.
    pub fn run(&mut self, mut on_result: impl FnMut(&ProbeResult)) -> Result<RunSummary> {
        let mut results = Vec::with_capacity(self.config.probe_count as usize);
        for sequence in 0..self.config.probe_count {
            let result = self.probe(sequence)?;
            on_result(&result);
            results.push(result);
            thread::sleep(self.config.interval);
        }
        let summary = RunSummary::new(self.config.probe_count, results);
        debug!(sent = summary.sent, replies = summary.replies(), "run complete");
        Ok(summary)
    }

    /// Sends a single echo request and waits for the datagram that answers it.
    pub fn probe(&mut self, sequence: u16) -> Result<ProbeResult> {
        let request = build_probe(
            sequence,
            self.identifier,
            self.config.payload_size,
            self.clock.now_millis(),
        );
        self.transport.send(self.destination, &request)?;

        let watch = TimeoutWatch::arm(self.config.timeout, Arc::clone(&self.terminator));
        let mut buffer = [0u8; RECEIVE_BUFFER_SIZE];
        let received = self.transport.receive(&mut buffer);
        if !watch.complete() {
            return Err(ProbeError::Timeout);
        }
        let (size, source) = received?;

        let reply = classify(&buffer[..size], source, self.identifier, self.clock.now_millis())?;
        debug!(
            sequence,
            reply_identifier = reply.identifier,
            reply_sequence = reply.sequence,
            echoed_timestamp = ?reply.timestamp,
            outcome = ?reply.outcome,
            "probe answered"
        );

        Ok(ProbeResult {
            sequence,
            outcome: reply.outcome,
            size,
            source,
            ttl: reply.ttl,
        })
    }
}
