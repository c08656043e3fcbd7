//! Thread-safe control surface for braid routing graphs.
//!
//! A [`ControlFacade`] owns the graph and its modulation sources. The control
//! thread edits through it; the audio callback renders through an
//! [`AudioHandle`] obtained from it.
//!
//! # Threading
//!
//! | Thread  | Entry point                      | Blocking                    |
//! |---------|----------------------------------|-----------------------------|
//! | Control | `ControlFacade` mutators         | waits for the render lock   |
//! | Audio   | [`AudioHandle::render`]          | never; skips the block      |
//!
//! Module latency changes observed while rendering are queued to the control
//! thread and folded in before the next edit or on
//! [`ControlFacade::poll_latency_events`].
//!
//! # Example
//!
//! ```rust
//! use braid_core::{AudioBuffer, ProcessSetup};
//! use braid_engine::ControlFacade;
//! use braid_graph::SplitType;
//!
//! let facade = ControlFacade::new(ProcessSetup::new(48000.0, 256, 2), 64);
//! facade.set_split_type(SplitType::Parallel);
//! facade.add_chain();
//! facade.insert_gain_stage(1, 0);
//! facade.set_gain_linear(1, 0, 0.5);
//!
//! let mut audio = facade.audio_handle();
//! let mut buffer = AudioBuffer::new(2, 256);
//! assert!(audio.render(&mut buffer, None));
//! ```

mod audio;
mod facade;

pub use audio::AudioHandle;
pub use facade::{ControlFacade, LatencyListener};
