//! Supervisor
//!
//! Builds the controller queues, hands each task exactly the queue ends it
//! needs, and runs the tasks concurrently until shutdown.
//!
//! # Shutdown protocol
//! 1. Someone raises the shared [`Shutdown`] signal (normally the OS signal
//!    handler).
//! 2. Ingest and navigation exit at their next wait point. The bus actor
//!    finishes any transaction already in flight, then writes Park.
//! 3. Once ingest, navigation and the bus actor have all returned, the error
//!    sink is told to drain and stop.
//! 4. `run` returns only after every task has returned, so the last bus
//!    transaction before the process exits is the Park write.

use embassy_futures::join::{join, join3};
use embedded_hal_async::i2c::I2c;
use log::info;

use super::bus_actor::{BusActor, BusActorQueues, BusActorSettings};
use super::error_sink::{error_sink, ErrorTally, ProducersDone};
use super::navigate::{navigate, NavigateQueues, Navigator};
use super::sentence_ingest::{sentence_ingest, IngestStats};
use crate::codec::bus::BusCodec;
use crate::config::Config;
use crate::error::Result;
use crate::system::event::{CommandChannel, ErrorChannel, FixChannel, ProximityChannel};
use crate::system::proximity::SensorArray;
use crate::system::shutdown::Shutdown;
use crate::system::state::NavState;
use crate::transport::LineSource;

/// All controller queues, kept together so they can live on the heap
struct Queues {
    fixes: FixChannel,
    proximity: ProximityChannel,
    commands: CommandChannel,
    errors: ErrorChannel,
    producers_done: ProducersDone,
}

impl Queues {
    fn new() -> Self {
        Self {
            fixes: FixChannel::new(),
            proximity: ProximityChannel::new(),
            commands: CommandChannel::new(),
            errors: ErrorChannel::new(),
            producers_done: ProducersDone::new(),
        }
    }
}

/// What each task reported when it returned
#[derive(Debug)]
pub struct RunSummary<B> {
    pub ingest: IngestStats,
    pub nav_state: NavState,
    pub errors: ErrorTally,
    /// Bus handle handed back by the bus actor
    pub bus: B,
}

/// Owns the transports and the configuration of one controller run
pub struct Supervisor<B, L> {
    bus: B,
    lines: L,
    codec: BusCodec,
    sensors: SensorArray,
    bus_settings: BusActorSettings,
    navigator: Navigator,
}

impl<B: I2c, L: LineSource> Supervisor<B, L> {
    /// Validates `config` and takes ownership of both transports
    pub fn new(config: &Config, bus: B, lines: L) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            bus,
            lines,
            codec: config.codec()?,
            sensors: config.sensor_array()?,
            bus_settings: BusActorSettings::from_config(config),
            navigator: Navigator::from_config(&config.navigation),
        })
    }

    /// Runs every task until `shutdown` is raised and all of them have returned
    pub async fn run(self, shutdown: &Shutdown) -> RunSummary<B> {
        let queues = Box::new(Queues::new());
        let actor = BusActor::new(self.bus, self.codec, self.sensors, self.bus_settings);

        let ingest = sentence_ingest(
            self.lines,
            queues.fixes.sender(),
            queues.errors.sender(),
            shutdown,
        );
        let nav = navigate(
            self.navigator,
            NavigateQueues {
                fixes: queues.fixes.receiver(),
                proximity: queues.proximity.receiver(),
                commands: queues.commands.sender(),
            },
            shutdown,
        );
        let bus = actor.run(
            BusActorQueues {
                commands: queues.commands.receiver(),
                proximity: queues.proximity.sender(),
                errors: queues.errors.sender(),
            },
            shutdown,
        );

        let producers = async {
            let out = join3(ingest, nav, bus).await;
            queues.producers_done.signal(());
            out
        };
        let sink = error_sink(queues.errors.receiver(), &queues.producers_done);

        info!("Supervisor running");
        let ((ingest, navigator, bus), errors) = join(producers, sink).await;
        info!("All tasks stopped");

        RunSummary {
            ingest,
            nav_state: navigator.state().clone(),
            errors,
            bus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::state::Mode;
    use crate::task::bus_actor::tests::{FakeBus, Write};
    use crate::task::sentence_ingest::tests::{sentence, ScriptedLines};
    use embassy_futures::block_on;
    use embassy_time::{Duration, Timer};

    fn config() -> Config {
        let mut config = Config::default();
        config.bus.poll_interval_ms = 10;
        config.navigation.target_latitude = 37.7749;
        config.navigation.target_longitude = -122.4194;
        config
    }

    fn park_pair() -> [Write; 2] {
        [
            Write {
                address: 0x1A,
                bytes: vec![0x01, 0x00],
            },
            Write {
                address: 0x1A,
                bytes: vec![0x02, 0x00],
            },
        ]
    }

    #[test]
    fn obstacle_then_clear_drives_turn_and_resume() {
        // Forward sensor: clear, near for three polls, then clear again
        let statuses = [
            [0x00, 0x00, 0x00],
            [0x00, 0x00, 0x00],
            [0x00, 0x00, 0x00],
            [0x00, 0x00, 0x00],
            [0x00, 0x00, 0x00],
            [0x00, 0x90, 0x00],
            [0x00, 0x90, 0x00],
            [0x00, 0x90, 0x00],
            [0x00, 0x00, 0x00],
        ];
        let bus = FakeBus::with_statuses(&statuses);
        let lines = ScriptedLines::new(
            vec![sentence(
                "GPRMC,081836,A,3745.000,N,12225.164,W,1.0,0.0,130998,,,A",
            )],
            Duration::from_millis(1),
        )
        .hold_open();
        let supervisor = Supervisor::new(&config(), bus.clone(), lines).unwrap();
        let shutdown = Shutdown::new();

        let (summary, _) = block_on(join(
            supervisor.run(&shutdown),
            async {
                Timer::after_millis(200).await;
                shutdown.raise();
            },
        ));

        let drives: Vec<Vec<u8>> = bus
            .writes()
            .into_iter()
            .map(|w| w.bytes)
            .collect::<Vec<_>>()
            .chunks(2)
            .map(|pair| vec![pair[0][1], pair[1][1]])
            .collect();
        // forward, turn right (tie), forward again, park
        assert_eq!(
            drives,
            vec![vec![0xA0, 0xA0], vec![0x50, 0x00], vec![0xA0, 0xA0], vec![0x00, 0x00]]
        );
        assert_eq!(summary.nav_state.mode, Mode::Seeking(config().navigation.target()));
        assert_eq!(summary.ingest.fixes, 1);
    }

    #[test]
    fn park_follows_a_write_in_flight_at_shutdown() {
        let bus = FakeBus::default();
        bus.0.borrow_mut().write_delay = Some(Duration::from_millis(40));
        let lines = ScriptedLines::new(
            vec![sentence(
                "GPRMC,081836,A,3745.000,N,12225.164,W,1.0,0.0,130998,,,A",
            )],
            Duration::from_millis(1),
        )
        .hold_open();
        let mut config = config();
        config.bus.transaction_timeout_ms = 500;
        let supervisor = Supervisor::new(&config, bus.clone(), lines).unwrap();
        let shutdown = Shutdown::new();

        block_on(join(
            supervisor.run(&shutdown),
            async {
                // The forward command's first motor write is on the wire now
                Timer::after_millis(20).await;
                shutdown.raise();
            },
        ));

        let writes = bus.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0].bytes, vec![0x01, 0xA0]);
        assert_eq!(writes[1].bytes, vec![0x02, 0xA0]);
        assert_eq!(writes[2..], park_pair()[..]);
    }

    #[test]
    fn arrival_parks_and_nothing_follows_but_the_final_park() {
        let lines = ScriptedLines::new(
            vec![
                sentence("GPRMC,081836,A,3746.400,N,12225.164,W,1.0,0.0,130998,,,A"),
                sentence("GPRMC,081837,A,3746.480,N,12225.164,W,1.0,0.0,130998,,,A"),
                sentence("GPRMC,081838,A,3746.493,N,12225.164,W,1.0,0.0,130998,,,A"),
                sentence("GPRMC,081839,A,3746.494,N,12225.164,W,1.0,0.0,130998,,,A"),
                sentence("GPRMC,081840,A,3746.400,N,12225.164,W,1.0,180.0,130998,,,A"),
            ],
            Duration::from_millis(5),
        )
        .hold_open();
        let bus = FakeBus::default();
        let supervisor = Supervisor::new(&config(), bus.clone(), lines).unwrap();
        let shutdown = Shutdown::new();

        let (summary, _) = block_on(join(
            supervisor.run(&shutdown),
            async {
                Timer::after_millis(100).await;
                shutdown.raise();
            },
        ));

        assert_eq!(summary.nav_state.mode, Mode::Arrived);
        let writes = bus.writes();
        // forward, park on arrival, final park
        assert_eq!(writes.len(), 6);
        assert_eq!(writes[2..4], park_pair()[..]);
        assert_eq!(writes[4..], park_pair()[..]);
        assert_eq!(summary.ingest.fixes, 5);
        assert_eq!(summary.errors.total(), 0);
    }

    #[test]
    fn bad_sentences_reach_the_error_sink() {
        let lines = ScriptedLines::new(
            vec![
                "$GPRMC,bad*00".to_string(),
                sentence("GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            ],
            Duration::from_millis(1),
        );
        let bus = FakeBus::default();
        let supervisor = Supervisor::new(&config(), bus.clone(), lines).unwrap();
        let shutdown = Shutdown::new();

        let (summary, _) = block_on(join(
            supervisor.run(&shutdown),
            async {
                Timer::after_millis(50).await;
                shutdown.raise();
            },
        ));

        assert_eq!(summary.errors.sentence, 2);
        assert_eq!(summary.nav_state.mode, Mode::Idle);
        assert_eq!(bus.writes(), park_pair().to_vec());
    }
}
