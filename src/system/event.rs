//! System Events
//!
//! Typed queues between the controller tasks. Every queue is a bounded
//! multi-producer, single-consumer embassy channel; within one queue delivery
//! order equals send order, across queues there is no ordering.
//!
//! Producers block when a queue is full. Blocking sends from control tasks
//! are raced against the shutdown signal (see [`send_or_stop`]) so that a
//! consumer which already exited cannot wedge its producer.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};

use super::drive_command::DriveCommand;
use super::position::PositionFix;
use super::proximity::ProximityChange;
use super::shutdown::Shutdown;
use crate::error::Error;

/// Capacity of every controller queue
pub const QUEUE_DEPTH: usize = 100;

/// Queue of decoded fixes (ingest → navigator)
pub type FixChannel = Channel<CriticalSectionRawMutex, PositionFix, QUEUE_DEPTH>;
pub type FixSender<'a> = Sender<'a, CriticalSectionRawMutex, PositionFix, QUEUE_DEPTH>;
pub type FixReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, PositionFix, QUEUE_DEPTH>;

/// Queue of proximity change events (bus actor → navigator)
pub type ProximityChannel = Channel<CriticalSectionRawMutex, ProximityChange, QUEUE_DEPTH>;
pub type ProximitySender<'a> = Sender<'a, CriticalSectionRawMutex, ProximityChange, QUEUE_DEPTH>;
pub type ProximityReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, ProximityChange, QUEUE_DEPTH>;

/// Queue of drive commands (navigator → bus actor)
pub type CommandChannel = Channel<CriticalSectionRawMutex, DriveCommand, QUEUE_DEPTH>;
pub type CommandSender<'a> = Sender<'a, CriticalSectionRawMutex, DriveCommand, QUEUE_DEPTH>;
pub type CommandReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, DriveCommand, QUEUE_DEPTH>;

/// Queue of reported errors (every task → error sink)
pub type ErrorChannel = Channel<CriticalSectionRawMutex, Error, QUEUE_DEPTH>;
pub type ErrorSender<'a> = Sender<'a, CriticalSectionRawMutex, Error, QUEUE_DEPTH>;
pub type ErrorReceiver<'a> = Receiver<'a, CriticalSectionRawMutex, Error, QUEUE_DEPTH>;

/// Outcome of a send raced against shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Stopped,
}

/// Sends `msg`, giving up if the shutdown signal is raised while blocked
pub async fn send_or_stop<T, const N: usize>(
    sender: &Sender<'_, CriticalSectionRawMutex, T, N>,
    msg: T,
    shutdown: &Shutdown,
) -> Delivery {
    match select(shutdown.wait(), sender.send(msg)).await {
        Either::First(_) => Delivery::Stopped,
        Either::Second(_) => Delivery::Sent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn send_succeeds_with_room() {
        let channel: Channel<CriticalSectionRawMutex, u8, 2> = Channel::new();
        let shutdown = Shutdown::new();
        let delivery = block_on(send_or_stop(&channel.sender(), 1, &shutdown));
        assert_eq!(delivery, Delivery::Sent);
        assert_eq!(channel.try_receive().ok(), Some(1));
    }

    #[test]
    fn full_queue_yields_to_shutdown() {
        let channel: Channel<CriticalSectionRawMutex, u8, 1> = Channel::new();
        let shutdown = Shutdown::new();
        let sender = channel.sender();
        assert_eq!(block_on(send_or_stop(&sender, 1, &shutdown)), Delivery::Sent);
        shutdown.raise();
        assert_eq!(block_on(send_or_stop(&sender, 2, &shutdown)), Delivery::Stopped);
        assert_eq!(channel.len(), 1);
    }
}
