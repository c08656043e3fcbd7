//! Braid Core - DSP primitives and hosted-module contracts
//!
//! This crate provides the building blocks the braid routing graph is made of,
//! designed for real-time audio processing with zero allocation in the audio path.
//!
//! # Core Abstractions
//!
//! ## Buffers
//!
//! - [`AudioBuffer`] - Fixed-capacity multi-channel block (mono or stereo)
//! - [`CompensationDelay`] - Resizable multi-channel delay for latency alignment
//! - [`ProcessSetup`] - Sample rate, maximum block size and bus channel count
//!
//! ## Hosted Modules
//!
//! - [`Effect`] - Object-safe block processing trait
//! - [`ParameterInfo`] - Index-based parameter discovery by name
//! - [`PluginModule`] - A hosted effect module: parameters, opaque state, channel layout
//! - [`PluginDescriptor`] - Identity a loader uses to re-create a module
//!
//! ## Filters
//!
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook coefficients
//! - [`LinkwitzRiley`] - 4th-order crossover filter (low-pass, high-pass, all-pass)
//!
//! ## Modulation & Dynamics
//!
//! - [`Lfo`] - Low-frequency oscillator (5 waveforms)
//! - [`EnvelopeFollower`] - Amplitude envelope detection
//! - [`SmoothedParam`] - Exponential smoothing for zipper-free gain changes
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default `std`
//! feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! braid-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod buffer;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod lfo;
pub mod linkwitz_riley;
pub mod math;
pub mod param;
pub mod param_info;
pub mod plugin;

pub use biquad::{Biquad, Coefficients, allpass_coefficients, highpass_coefficients, lowpass_coefficients};
pub use buffer::{AudioBuffer, MAX_CHANNELS, ProcessSetup};
pub use delay::CompensationDelay;
pub use effect::Effect;
pub use envelope::EnvelopeFollower;
pub use lfo::{Lfo, LfoWaveform};
pub use linkwitz_riley::{FilterKind, LinkwitzRiley};
pub use math::{db_to_linear, mono_sum, pan_gains};
pub use param::SmoothedParam;
pub use param_info::{ParamDescriptor, ParameterInfo};
pub use plugin::{ModuleStateError, PluginDescriptor, PluginModule};
