//! Ground vehicle navigation controller
//!
//! Fuses GPS fixes from a serial line and IR proximity readings from a shared
//! I2C peripheral into motor commands that drive the vehicle toward a goal
//! while avoiding obstacles.
//!
//! The controller runs as a small set of cooperating async tasks joined by a
//! [`task::supervisor::Supervisor`]:
//!
//! - `sentence_ingest`: serial lines → decoded fixes
//! - `bus_actor`: sole owner of the I2C bus; polls status, writes drive commands
//! - `navigate`: fixes + proximity changes → drive commands
//! - `error_sink`: logs what the others report
//!
//! Tasks share nothing but bounded queues and one broadcast shutdown signal.

pub mod codec;
pub mod config;
pub mod error;
pub mod system;
pub mod task;
pub mod transport;

pub use config::Config;
pub use error::{Error, Result};
