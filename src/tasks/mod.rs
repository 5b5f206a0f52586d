//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Memory pressure: sheds soft cache values when system memory runs low

mod pressure;

pub use pressure::{spawn_pressure_monitor, MemoryProbe, PressureSettings, SystemMemoryProbe};
