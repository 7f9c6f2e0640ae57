//! Lockstep TFTP client: fetch (`get`) and push (`put`) files over UDP.
//!
//! The protocol machinery lives under [`tftp`]; [`config`] reads the optional
//! configuration file used by the `tftpc` binary.

pub mod config;
pub mod tftp;
