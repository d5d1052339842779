//! Capture processing
//!
//! Scans each capture for frames, decodes them, timestamps them against the
//! size/time log and hands them to a [`MessageSink`] in file order. Frames
//! that cannot be decoded, timed or converted are skipped and counted; only
//! I/O failures stop the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::arinc::{decode_frame, Arinc708Message, HEADER_LEN};
use crate::capture::{capture_name, FrameScanner};
use crate::output::{MessageSink, WriteError};
use crate::timeline::{list_sources, LogSample, Timeline};

/// Decoded frames buffered per capture between a worker and the writer
const FRAME_QUEUE: usize = 1024;

/// Frame counters for one capture, or summed over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames_seen: u64,
    pub frames_written: u64,
    pub decode_errors: u64,
    pub timestamp_errors: u64,
    pub conversion_errors: u64,
    pub truncated_frames: u64,
}

impl FrameStats {
    pub fn frames_skipped(&self) -> u64 {
        self.decode_errors + self.timestamp_errors + self.conversion_errors + self.truncated_frames
    }

    pub fn add(&mut self, other: &FrameStats) {
        self.frames_seen += other.frames_seen;
        self.frames_written += other.frames_written;
        self.decode_errors += other.decode_errors;
        self.timestamp_errors += other.timestamp_errors;
        self.conversion_errors += other.conversion_errors;
        self.truncated_frames += other.truncated_frames;
    }
}

/// Run totals
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub files_processed: u64,
    /// Captures excluded because the log has no rows for them
    pub files_skipped: u64,
    pub frames: FrameStats,
}

impl fmt::Display for ProcessStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Files: {} processed, {} skipped | Frames: {} seen, {} written, {} skipped \
             (decode: {}, timestamp: {}, conversion: {}, truncated: {})",
            self.files_processed,
            self.files_skipped,
            self.frames.frames_seen,
            self.frames.frames_written,
            self.frames.frames_skipped(),
            self.frames.decode_errors,
            self.frames.timestamp_errors,
            self.frames.conversion_errors,
            self.frames.truncated_frames,
        )
    }
}

/// Outcome stream of one capture in the worker pipeline
enum Event {
    Frame {
        offset: usize,
        time: DateTime<Utc>,
        message: Arinc708Message,
    },
    Done(FrameStats),
    Failed(anyhow::Error),
}

/// Captures to process, each with its timeline
pub struct Processor {
    captures: Vec<PathBuf>,
    timelines: Vec<Timeline>,
    excluded: u64,
}

impl Processor {
    /// Keep the captures the log has rows for and build their timelines.
    ///
    /// Fails if none remain or a timeline cannot be built, so nothing is
    /// written for a log that does not describe the given captures.
    pub fn new(captures: &[PathBuf], rows: &[LogSample]) -> Result<Self> {
        let sources = list_sources(rows);
        // any buildable timeline knows every file the log mentions
        let mut first_error = None;
        let log = sources.iter().find_map(|source| match Timeline::build(rows, Some(source)) {
            Ok(timeline) => Some(timeline),
            Err(e) => {
                first_error.get_or_insert((source, e));
                None
            }
        });
        let log = match (log, first_error) {
            (Some(log), _) => log,
            (None, Some((source, e))) => {
                return Err(e).with_context(|| format!("Failed to build timeline for {}", source));
            }
            (None, None) => bail!("The size/time log has no rows"),
        };

        let mut kept = Vec::with_capacity(captures.len());
        let mut timelines = Vec::with_capacity(captures.len());
        let mut excluded = 0;
        for capture in captures {
            if !log.includes(&capture.to_string_lossy()) {
                warn!("Excluding {} as it has no time data", capture.display());
                excluded += 1;
                continue;
            }

            let name = capture_name(capture);
            let timeline = if name == log.file() {
                log.clone()
            } else {
                Timeline::build(rows, Some(&name)).with_context(|| format!("Failed to build timeline for {}", name))?
            };
            debug!(
                "{}: logged {} to {} ({} grid points)",
                name,
                timeline.start(),
                timeline.end(),
                timeline.len()
            );
            kept.push(capture.clone());
            timelines.push(timeline);
        }

        if kept.is_empty() {
            bail!(
                "None of the {} capture files appear in the size/time log (log covers: {})",
                captures.len(),
                sources.join(", ")
            );
        }

        Ok(Self {
            captures: kept,
            timelines,
            excluded,
        })
    }

    /// Captures that will be processed, in order
    pub fn captures(&self) -> &[PathBuf] {
        &self.captures
    }

    /// Process every capture into `sink`, on `workers` threads when above one
    pub fn run<S: MessageSink>(&self, sink: &mut S, workers: usize) -> Result<ProcessStats> {
        let mut stats = ProcessStats {
            files_skipped: self.excluded,
            ..Default::default()
        };

        let per_file = if workers > 1 && self.captures.len() > 1 {
            self.run_pipeline(sink, workers)?
        } else {
            self.run_sequential(sink)?
        };

        for file in &per_file {
            stats.files_processed += 1;
            stats.frames.add(file);
        }

        Ok(stats)
    }

    fn run_sequential<S: MessageSink>(&self, sink: &mut S) -> Result<Vec<FrameStats>> {
        let mut per_file = Vec::with_capacity(self.captures.len());

        for (capture, timeline) in self.captures.iter().zip(&self.timelines) {
            let name = capture_name(capture);
            let mut delivered = FrameStats::default();
            let mut file = scan_capture(capture, timeline, |offset, time, message| {
                deliver(sink, &name, offset, time, &message, &mut delivered)
            })?;

            file.add(&delivered);
            report_file(&name, &file);
            per_file.push(file);
        }

        Ok(per_file)
    }

    /// Workers take captures from a queue in input order and stream frames
    /// through one bounded channel per capture. This thread owns the sink
    /// and drains the channels in input order.
    fn run_pipeline<S: MessageSink>(&self, sink: &mut S, workers: usize) -> Result<Vec<FrameStats>> {
        let workers = workers.min(self.captures.len());
        info!("Processing {} captures on {} workers", self.captures.len(), workers);

        thread::scope(|scope| -> Result<Vec<FrameStats>> {
            let (job_tx, job_rx) = unbounded::<(&Path, &Timeline, Sender<Event>)>();
            let mut receivers: Vec<(String, Receiver<Event>)> = Vec::with_capacity(self.captures.len());

            for (capture, timeline) in self.captures.iter().zip(&self.timelines) {
                let (event_tx, event_rx) = bounded(FRAME_QUEUE);
                job_tx
                    .send((capture.as_path(), timeline, event_tx))
                    .map_err(|_| anyhow!("Worker queue closed"))?;
                receivers.push((capture_name(capture), event_rx));
            }
            drop(job_tx);

            for id in 0..workers {
                let jobs = job_rx.clone();
                thread::Builder::new()
                    .name(format!("wxrx-worker-{}", id))
                    .spawn_scoped(scope, move || {
                        for (capture, timeline, events) in jobs {
                            run_worker(capture, timeline, &events);
                        }
                    })
                    .context("Failed to spawn worker thread")?;
            }
            drop(job_rx);

            let mut per_file = Vec::with_capacity(receivers.len());
            for (name, events) in receivers {
                let mut delivered = FrameStats::default();
                let mut file = loop {
                    match events.recv() {
                        Ok(Event::Frame { offset, time, message }) => {
                            deliver(sink, &name, offset, time, &message, &mut delivered)?
                        }
                        Ok(Event::Done(scanned)) => break scanned,
                        Ok(Event::Failed(e)) => return Err(e),
                        Err(_) => bail!("Worker for {} stopped without a result", name),
                    }
                };

                file.add(&delivered);
                report_file(&name, &file);
                per_file.push(file);
            }

            Ok(per_file)
        })
    }
}

fn run_worker(capture: &Path, timeline: &Timeline, events: &Sender<Event>) {
    let result = scan_capture(capture, timeline, |offset, time, message| {
        events
            .send(Event::Frame { offset, time, message })
            .map_err(|_| anyhow!("Writer stopped"))
    });

    let last = match result {
        Ok(stats) => Event::Done(stats),
        Err(e) => Event::Failed(e),
    };
    // the writer only hangs up after a fatal error of its own
    let _ = events.send(last);
}

/// Scan one capture and pass every decoded, timestamped frame to `emit` in
/// offset order. Returns the scan-side counters.
fn scan_capture<F>(capture: &Path, timeline: &Timeline, mut emit: F) -> Result<FrameStats>
where
    F: FnMut(usize, DateTime<Utc>, Arinc708Message) -> Result<()>,
{
    let name = capture_name(capture);
    let data = fs::read(capture).with_context(|| format!("Failed to read capture {}", capture.display()))?;

    info!(
        "Processing {} ({} bytes, logged {} to {})",
        name,
        data.len(),
        timeline.start(),
        timeline.end()
    );

    let mut stats = FrameStats::default();
    let mut frames = FrameScanner::new(&data);

    for (offset, frame) in frames.by_ref() {
        stats.frames_seen += 1;

        let message = match decode_frame(frame) {
            Ok(message) => message,
            Err(e) => {
                debug!("{}: frame at offset {} skipped: {}", name, offset, e);
                stats.decode_errors += 1;
                continue;
            }
        };

        let time = match timeline.time_at_offset(offset as u64, Some(&name)) {
            Ok(time) => time,
            Err(e) => {
                debug!("{}: frame at offset {} skipped: {}", name, offset, e);
                stats.timestamp_errors += 1;
                continue;
            }
        };

        debug!(
            "{}: frame at offset {} header {} mode {} time {}",
            name,
            offset,
            hex::encode(&frame[..HEADER_LEN]),
            message.operating_mode_kind().description(),
            time
        );
        emit(offset, time, message)?;
    }

    if let Some((offset, len)) = frames.truncated_tail() {
        debug!("{}: partial frame at offset {} ({} bytes) skipped", name, offset, len);
        stats.frames_seen += 1;
        stats.truncated_frames += 1;
    }

    Ok(stats)
}

/// Write one message, counting conversion rejects. Sink I/O errors are fatal.
fn deliver<S: MessageSink>(
    sink: &mut S,
    name: &str,
    offset: usize,
    time: DateTime<Utc>,
    message: &Arinc708Message,
    stats: &mut FrameStats,
) -> Result<()> {
    match sink.write_message(time, message) {
        Ok(()) => stats.frames_written += 1,
        Err(WriteError::Rejected(e)) => {
            debug!("{}: frame at offset {} dropped: {}", name, offset, e);
            stats.conversion_errors += 1;
        }
        Err(WriteError::Io(e)) => {
            return Err(e).with_context(|| format!("Failed to write frame at offset {} of {}", offset, name));
        }
    }
    Ok(())
}

fn report_file(name: &str, stats: &FrameStats) {
    info!("{}: {} of {} frames written", name, stats.frames_written, stats.frames_seen);
    if stats.frames_skipped() > 0 {
        warn!(
            "{}: skipped {} frames (decode: {}, timestamp: {}, conversion: {}, truncated: {})",
            name,
            stats.frames_skipped(),
            stats.decode_errors,
            stats.timestamp_errors,
            stats.conversion_errors,
            stats.truncated_frames
        );
    }
}
