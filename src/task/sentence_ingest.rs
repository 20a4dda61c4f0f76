//! Sentence Ingest Task
//!
//! Reads positioning sentences line by line, decodes them and forwards fixes
//! to the navigator. Decode errors, including sentences of other classes, are
//! reported to the error sink and never stop the loop. The task ends at end
//! of stream, on a read error, or on shutdown.

use embassy_futures::select::{select, Either};
use embassy_time::Instant;
use log::{debug, info, warn};

use crate::codec::nmea::parse_rmc;
use crate::error::Error;
use crate::system::event::{send_or_stop, Delivery, ErrorSender, FixSender};
use crate::system::shutdown::Shutdown;
use crate::transport::LineSource;

/// Counters kept by the ingest loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: usize,
    pub fixes: usize,
    pub rejected: usize,
}

/// Ingest loop over `source`
pub async fn sentence_ingest<L: LineSource>(
    mut source: L,
    fixes: FixSender<'_>,
    errors: ErrorSender<'_>,
    shutdown: &Shutdown,
) -> IngestStats {
    info!("Sentence ingest started");
    let mut stats = IngestStats::default();

    loop {
        let line = match select(shutdown.wait(), source.read_line()).await {
            Either::First(_) => break,
            Either::Second(Ok(Some(line))) => line,
            Either::Second(Ok(None)) => {
                info!("Sentence stream ended");
                break;
            }
            Either::Second(Err(e)) => {
                warn!("Sentence stream failed");
                errors.send(e).await;
                break;
            }
        };
        stats.lines += 1;

        match parse_rmc(&line, Instant::now()) {
            Ok(fix) => {
                stats.fixes += 1;
                if send_or_stop(&fixes, fix, shutdown).await == Delivery::Stopped {
                    break;
                }
            }
            Err(Error::UnsupportedSentence(class)) => {
                // Receivers interleave many sentence classes; not worth a warning each
                debug!("Skipping {} sentence", class);
                stats.rejected += 1;
                errors.send(Error::UnsupportedSentence(class)).await;
            }
            Err(e) => {
                stats.rejected += 1;
                errors.send(e).await;
            }
        }
    }

    info!(
        "Sentence ingest stopped ({} lines, {} fixes, {} rejected)",
        stats.lines, stats.fixes, stats.rejected
    );
    stats
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::nmea::checksum;
    use crate::error::Result;
    use crate::system::event::{ErrorChannel, FixChannel};
    use embassy_futures::block_on;
    use embassy_time::{Duration, Timer};
    use std::collections::VecDeque;

    /// Line source replaying a fixed script, one line per `gap`
    pub struct ScriptedLines {
        lines: VecDeque<String>,
        gap: Duration,
        hold_open: bool,
    }

    impl ScriptedLines {
        pub fn new<I: IntoIterator<Item = String>>(lines: I, gap: Duration) -> Self {
            Self {
                lines: lines.into_iter().collect(),
                gap,
                hold_open: false,
            }
        }

        /// Pend forever after the script instead of reporting end of stream
        pub fn hold_open(mut self) -> Self {
            self.hold_open = true;
            self
        }
    }

    impl LineSource for ScriptedLines {
        async fn read_line(&mut self) -> Result<Option<String>> {
            match self.lines.pop_front() {
                Some(line) => {
                    Timer::after(self.gap).await;
                    Ok(Some(line))
                }
                None if self.hold_open => core::future::pending().await,
                None => Ok(None),
            }
        }
    }

    pub fn sentence(payload: &str) -> String {
        format!("${}*{:02X}", payload, checksum(payload))
    }

    #[test]
    fn forwards_fixes_and_reports_bad_lines() {
        let lines = vec![
            sentence("GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A"),
            sentence("GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00"),
            "$GPRMC,081836,A,3746.494,N,12225.164,W,0.0,0.0,130998,,,A*00".to_string(),
            "garbage".to_string(),
            sentence("GPRMC,081837,V,,,,,,,130998,,,N"),
        ];
        let fixes = FixChannel::new();
        let errors = ErrorChannel::new();
        let shutdown = Shutdown::new();

        let stats = block_on(sentence_ingest(
            ScriptedLines::new(lines, Duration::from_millis(1)),
            fixes.sender(),
            errors.sender(),
            &shutdown,
        ));

        assert_eq!(
            stats,
            IngestStats {
                lines: 5,
                fixes: 2,
                rejected: 3
            }
        );
        assert!(fixes.try_receive().unwrap().valid);
        assert!(!fixes.try_receive().unwrap().valid);
        assert!(matches!(errors.try_receive(), Ok(Error::UnsupportedSentence(_))));
        assert!(matches!(errors.try_receive(), Ok(Error::ChecksumMismatch { .. })));
        assert!(matches!(errors.try_receive(), Ok(Error::MalformedSentence(_))));
    }

    #[test]
    fn stops_on_shutdown_while_waiting_for_a_line() {
        let fixes = FixChannel::new();
        let errors = ErrorChannel::new();
        let shutdown = Shutdown::new();
        shutdown.raise();

        let stats = block_on(sentence_ingest(
            ScriptedLines::new(Vec::new(), Duration::from_millis(1)).hold_open(),
            fixes.sender(),
            errors.sender(),
            &shutdown,
        ));
        assert_eq!(stats, IngestStats::default());
    }
}
