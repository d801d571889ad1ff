//! BGAPI Serial Protocol
//!
//! This crate provides types and utilities for talking to a BLE radio dongle
//! over its BGAPI serial interface, restricted to the subset needed to drive
//! Myo armbands. Every message is a 4-byte header followed by a
//! length-prefixed payload.
//!
//! # Protocol Overview
//!
//! Messages are either:
//!
//! - **Commands** (host → dongle): header type bit clear, `class`/`command` select the call
//! - **Responses** (dongle → host): same ids as the command they answer, type bit clear
//! - **Events** (dongle → host): unsolicited, type bit set
//!
//! # Example
//!
//! ```rust,ignore
//! use myolink_bgapi::{Command, FrameCodec, Message};
//!
//! // Build a command
//! let bytes = Command::GapDiscover { mode: DiscoverMode::Generic }.encode();
//!
//! // Parse incoming data
//! codec.push(&received);
//! while let Some(frame) = codec.decode() {
//!     let message = Message::decode(&frame)?;
//! }
//! ```

mod commands;
mod constants;
mod error;
mod events;
mod frame;
pub mod myohw;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use events::*;
pub use frame::*;
pub use types::*;
