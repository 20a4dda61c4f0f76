//! GPS serial line source
//!
//! `serialport` reads block the calling thread, so a dedicated reader thread
//! splits the byte stream into lines and hands them to the executor through
//! an embassy channel. The thread polls with a short read timeout so it can
//! notice when the source is dropped.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use super::LineSource;
use crate::error::{Error, Result};

/// Raw lines buffered between the reader thread and the ingest task
const LINE_QUEUE_DEPTH: usize = 16;

/// Read timeout so the reader thread can observe shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest line accepted before the buffer is discarded (NMEA allows 82)
const MAX_LINE_LEN: usize = 256;

enum SerialLine {
    Line(String),
    Closed(String),
}

type LineChannel = Channel<CriticalSectionRawMutex, SerialLine, LINE_QUEUE_DEPTH>;

/// Line source backed by a serial port reader thread
pub struct SerialLineSource {
    lines: Arc<LineChannel>,
    running: Arc<AtomicBool>,
    closed: bool,
}

impl SerialLineSource {
    /// Opens `path` at `baud_rate`, 8 data bits, no parity, 1 stop bit
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);
        Self::spawn(port)
    }

    /// Starts the reader thread over any byte stream
    fn spawn<R: Read + Send + 'static>(port: R) -> Result<Self> {
        let lines = Arc::new(LineChannel::new());
        let running = Arc::new(AtomicBool::new(true));
        thread::Builder::new()
            .name("gps-serial".to_string())
            .spawn({
                let lines = Arc::clone(&lines);
                let running = Arc::clone(&running);
                move || read_lines(port, &lines, &running)
            })?;

        Ok(Self {
            lines,
            running,
            closed: false,
        })
    }
}

impl LineSource for SerialLineSource {
    async fn read_line(&mut self) -> Result<Option<String>> {
        if self.closed {
            return Ok(None);
        }
        match self.lines.receive().await {
            SerialLine::Line(line) => Ok(Some(line)),
            SerialLine::Closed(reason) => {
                self.closed = true;
                Err(Error::LineSourceClosed(reason))
            }
        }
    }
}

impl Drop for SerialLineSource {
    /// Stops the reader thread without waiting for it; it exits within one
    /// read timeout.
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// Reader thread body: bytes in, complete lines out
fn read_lines<R: Read>(mut port: R, lines: &LineChannel, running: &AtomicBool) {
    let mut pending: Vec<u8> = Vec::with_capacity(MAX_LINE_LEN);
    let mut chunk = [0u8; 64];

    while running.load(Ordering::Relaxed) {
        let n = match port.read(&mut chunk) {
            Ok(0) => {
                close(lines, running, "end of stream".to_string());
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                close(lines, running, e.to_string());
                return;
            }
        };

        for &byte in &chunk[..n] {
            if byte == b'\n' {
                let line = String::from_utf8_lossy(&pending).trim_end().to_string();
                pending.clear();
                if !line.is_empty() {
                    forward(lines, line);
                }
            } else if pending.len() < MAX_LINE_LEN {
                pending.push(byte);
            } else {
                log::warn!("Discarding over-long serial line");
                pending.clear();
            }
        }
    }
    log::debug!("Serial reader stopped");
}

/// Drops the newest line when the executor side is not keeping up
fn forward(lines: &LineChannel, line: String) {
    if let Err(TrySendError::Full(_)) = lines.try_send(SerialLine::Line(line)) {
        log::warn!("Serial line queue full, dropping sentence");
    }
}

/// Delivers the close notice, waiting for room while the source is alive
fn close(lines: &LineChannel, running: &AtomicBool, reason: String) {
    log::warn!("Serial port closed: {}", reason);
    let mut notice = SerialLine::Closed(reason);
    while running.load(Ordering::Relaxed) {
        match lines.try_send(notice) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                notice = back;
                thread::sleep(READ_TIMEOUT);
            }
        }
    }
}
