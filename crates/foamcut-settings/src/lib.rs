//! FoamCut Settings Crate
//!
//! Handles the machine configuration record and its persistence.

pub mod config;

pub use config::{
    default_config_path, AxisMapping, CommandTemplates, FeedRates, FoamBlock, HomingSettings,
    KerfDirection, KerfSettings, KerfStrategy, MachineConfig, MachineGeometry, ParkingSettings,
    TravelSettings, WireSettings,
};
