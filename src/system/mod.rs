//! Core system types shared between controller tasks
pub mod drive_command;
pub mod event;
pub mod fair_select;
pub mod position;
pub mod proximity;
pub mod shutdown;
pub mod state;
