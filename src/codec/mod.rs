//! Wire formats: positioning sentences and peripheral bus transactions
pub mod bus;
pub mod nmea;
