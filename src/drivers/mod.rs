//! Peripheral drivers: power meter, outputs, target glue, watchdog.

pub mod actuators;
pub mod hw_init;
pub mod ina219;
pub mod output;
pub mod watchdog;
