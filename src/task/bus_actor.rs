//! Bus Actor
//!
//! The only code that ever issues a transaction on the shared peripheral bus.
//! Exclusive access is a property of construction: the actor owns the bus
//! handle by value and runs as one sequential loop, so no lock is needed.
//!
//! # Loop
//! Each iteration waits on the first of:
//! 1. the shutdown signal
//! 2. the poll ticker, or a queued drive command (alternating priority when
//!    both are ready, so neither starves)
//!
//! A tick reads the status endpoint, classifies the proximity bytes and
//! forwards only the directions whose category changed since the last
//! successful poll. A command becomes one write per motor.
//!
//! # Shutdown
//! The shutdown signal is only observed between transactions, so anything
//! already on the wire completes first. The actor then writes Park to both
//! motors, retrying a bounded number of times, and exits. Commands still in
//! the queue are dropped.

use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Ticker};
use embedded_hal_async::i2c::{Error as _, I2c};
use log::{debug, error, info, warn};

use crate::codec::bus::{BusCodec, MAX_STATUS_LEN};
use crate::config::Config;
use crate::error::{BusError, Error, Result};
use crate::system::drive_command::DriveCommand;
use crate::system::event::{
    send_or_stop, CommandReceiver, Delivery, ErrorSender, ProximitySender,
};
use crate::system::fair_select::RoundRobin;
use crate::system::proximity::{ProximityChange, ProximityTriple, SensorArray};
use crate::system::shutdown::Shutdown;

/// Timing and safety settings for the actor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusActorSettings {
    pub device_address: u8,
    pub poll_interval: Duration,
    pub transaction_timeout: Duration,
    pub park_attempts: u8,
    pub seed_clear_proximity: bool,
}

impl BusActorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            device_address: config.bus.device_address,
            poll_interval: config.bus.poll_interval(),
            transaction_timeout: config.bus.transaction_timeout(),
            park_attempts: config.bus.park_attempts,
            seed_clear_proximity: config.bus.seed_clear_proximity,
        }
    }
}

/// Queues the actor reads from and writes to
pub struct BusActorQueues<'a> {
    pub commands: CommandReceiver<'a>,
    pub proximity: ProximitySender<'a>,
    pub errors: ErrorSender<'a>,
}

/// What woke the actor
enum Wake {
    Stop,
    Tick,
    Command(DriveCommand),
}

/// Single owner of the peripheral bus
pub struct BusActor<B> {
    bus: B,
    codec: BusCodec,
    sensors: SensorArray,
    settings: BusActorSettings,
    last_proximity: Option<ProximityTriple>,
}

impl<B: I2c> BusActor<B> {
    pub fn new(bus: B, codec: BusCodec, sensors: SensorArray, settings: BusActorSettings) -> Self {
        let last_proximity = settings
            .seed_clear_proximity
            .then_some(ProximityTriple::CLEAR);
        Self {
            bus,
            codec,
            sensors,
            settings,
            last_proximity,
        }
    }

    /// Runs until shutdown, then parks the motors. Returns the bus handle.
    pub async fn run(mut self, queues: BusActorQueues<'_>, shutdown: &Shutdown) -> B {
        info!(
            "Bus actor started (device {:#04x}, poll every {} ms)",
            self.settings.device_address,
            self.settings.poll_interval.as_millis()
        );
        let mut ticker = Ticker::every(self.settings.poll_interval);
        let mut sources = RoundRobin::new();

        loop {
            let wake = match select(
                shutdown.wait(),
                sources.select(ticker.next(), queues.commands.receive()),
            )
            .await
            {
                Either::First(_) => Wake::Stop,
                Either::Second(Either::First(_)) => Wake::Tick,
                Either::Second(Either::Second(command)) => Wake::Command(command),
            };

            match wake {
                Wake::Stop => break,
                Wake::Tick => match self.poll().await {
                    Ok(changes) => {
                        for change in changes {
                            debug!("Proximity {:?} -> {:?}", change.direction, change.state);
                            if send_or_stop(&queues.proximity, change, shutdown).await
                                == Delivery::Stopped
                            {
                                break;
                            }
                        }
                    }
                    Err(e) => queues.errors.send(e).await,
                },
                Wake::Command(command) => {
                    debug!("Drive {:?}", command);
                    if let Err(e) = self.drive(&command).await {
                        queues.errors.send(e).await;
                    }
                }
            }
        }

        let mut dropped = 0;
        while queues.commands.try_receive().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            info!("Dropping {} queued drive commands", dropped);
        }
        self.park(&queues.errors).await;
        info!("Bus actor stopped");
        self.bus
    }

    /// Reads the status endpoint and returns the proximity directions that changed
    pub async fn poll(&mut self) -> Result<Vec<ProximityChange>> {
        let request = self.codec.status_request();
        let len = self.codec.status_length();
        let mut response = [0u8; MAX_STATUS_LEN];

        let address = self.settings.device_address;
        let outcome = with_timeout(
            self.settings.transaction_timeout,
            self.bus.write_read(address, &request, &mut response[..len]),
        )
        .await;
        check(request[0], outcome)?;

        let status = self.codec.decode_status(&response[..len])?;
        let triple = self.sensors.classify(status.proximity);
        let changes = match self.last_proximity {
            Some(previous) => triple.changes_since(&previous),
            None => Vec::new(),
        };
        self.last_proximity = Some(triple);
        Ok(changes)
    }

    /// Writes `command` to both motors, left first
    pub async fn drive(&mut self, command: &DriveCommand) -> Result<()> {
        let address = self.settings.device_address;
        for payload in self.codec.encode_drive(command) {
            let outcome = with_timeout(
                self.settings.transaction_timeout,
                self.bus.write(address, &payload),
            )
            .await;
            check(payload[0], outcome)?;
        }
        Ok(())
    }

    /// Final park write. Failures are reported; nothing else can be done.
    async fn park(&mut self, errors: &ErrorSender<'_>) {
        for attempt in 1..=self.settings.park_attempts {
            match self.drive(&DriveCommand::PARK).await {
                Ok(()) => {
                    info!("Motors parked");
                    return;
                }
                Err(e) => {
                    warn!(
                        "Park attempt {}/{} failed: {}",
                        attempt, self.settings.park_attempts, e
                    );
                    errors.send(e).await;
                }
            }
        }
        error!("Could not park motors; outputs remain at last commanded power");
    }
}

/// Folds a timed transaction outcome into the controller error type
fn check<E: embedded_hal_async::i2c::Error>(
    register: u8,
    outcome: core::result::Result<core::result::Result<(), E>, embassy_time::TimeoutError>,
) -> Result<()> {
    match outcome {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(Error::bus(register, BusError::Device(e.kind()))),
        Err(_) => Err(Error::bus(register, BusError::Timeout)),
    }
}
