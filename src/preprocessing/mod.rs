//! Audio preprocessing modules
//!
//! This module contains utilities for preparing audio for analysis:
//! - Channel mixing (interleaved multichannel to mono)

pub mod channel_mixer;

pub use channel_mixer::downmix_interleaved;
