//! Forward OpenVR device poses and controller state as OSC bundles over UDP.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
#[cfg(feature = "openvr")]
pub mod openvr_adaptor;
pub mod pose;
pub mod sender;
pub mod tracking;
pub mod tracking_messages;
