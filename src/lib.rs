#![warn(non_snake_case)]

pub mod analysis;
pub mod config;
pub mod exam;
pub mod net;
pub mod options;
pub mod report;
pub mod simulation;
