//! Error Sink Task
//!
//! Passive observer: logs every error the other tasks report and counts them.
//! It never feeds back into control decisions.
//!
//! The sink outlives the producers. It stops only when the supervisor signals
//! that every producer has returned, then drains what is left, so the bus
//! actor can still report a failed park write during shutdown.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use log::{debug, info, warn};

use crate::error::Error;
use crate::system::event::ErrorReceiver;

/// Raised by the supervisor once all producers have finished
pub type ProducersDone = Signal<CriticalSectionRawMutex, ()>;

/// Error counts by category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorTally {
    pub sentence: usize,
    pub bus: usize,
    pub other: usize,
}

impl ErrorTally {
    pub fn total(&self) -> usize {
        self.sentence + self.bus + self.other
    }

    fn record(&mut self, error: &Error) {
        if error.is_sentence_error() {
            self.sentence += 1;
        } else if matches!(error, Error::BusTransaction { .. } | Error::DecodeLength { .. }) {
            self.bus += 1;
        } else {
            self.other += 1;
        }
    }
}

/// Error sink loop
pub async fn error_sink(errors: ErrorReceiver<'_>, producers_done: &ProducersDone) -> ErrorTally {
    let mut tally = ErrorTally::default();

    loop {
        match select(errors.receive(), producers_done.wait()).await {
            Either::First(error) => report(&mut tally, error),
            Either::Second(_) => break,
        }
    }
    while let Ok(error) = errors.try_receive() {
        report(&mut tally, error);
    }

    info!(
        "Error sink stopped ({} sentence, {} bus, {} other)",
        tally.sentence, tally.bus, tally.other
    );
    tally
}

fn report(tally: &mut ErrorTally, error: Error) {
    tally.record(&error);
    match error {
        Error::UnsupportedSentence(_) => debug!("{}", error),
        _ => warn!("{}", error),
    }
}
