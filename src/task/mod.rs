//! Controller tasks
pub mod bus_actor;
pub mod error_sink;
pub mod navigate;
pub mod sentence_ingest;
pub mod supervisor;
