//! Parameter introspection for hosted modules.
//!
//! The [`ParameterInfo`] trait lets the graph discover a module's parameters
//! at runtime and drive them by index. The modulation router finds its
//! targets here by name, then writes values through
//! [`set_param`](ParameterInfo::set_param).
//!
//! # Design
//!
//! Parameters are addressed by zero-based index. Each is described by a
//! [`ParamDescriptor`]; hosted modules own their descriptors, so
//! [`ParameterInfo::param_info`] hands out a reference and never allocates.
//! Hosted module parameters live in normalized \[0.0, 1.0\] space, matching
//! the rest values and weighted sums the modulation layer produces.
//!
//! # Example
//!
//! ```rust
//! use braid_core::{ParameterInfo, ParamDescriptor};
//!
//! struct Drive {
//!     params: [ParamDescriptor; 1],
//!     drive: f32,
//! }
//!
//! impl ParameterInfo for Drive {
//!     fn param_count(&self) -> usize { 1 }
//!
//!     fn param_info(&self, index: usize) -> Option<&ParamDescriptor> {
//!         self.params.get(index)
//!     }
//!
//!     fn get_param(&self, index: usize) -> f32 {
//!         if index == 0 { self.drive } else { 0.0 }
//!     }
//!
//!     fn set_param(&mut self, index: usize, value: f32) {
//!         if index == 0 {
//!             self.drive = value;
//!         }
//!     }
//! }
//!
//! let drive = Drive {
//!     params: [ParamDescriptor::normalized("Drive")],
//!     drive: 0.5,
//! };
//! assert_eq!(drive.find_param_by_name("drive"), Some(0));
//! ```

#[cfg(not(feature = "std"))]
use alloc::string::String;

/// Trait for modules that expose introspectable parameters.
///
/// Indices must be stable for the lifetime of the instance. Implementations
/// should ignore out-of-range indices in `set_param` and return `0.0` from
/// `get_param`.
pub trait ParameterInfo {
    /// Returns the number of parameters. Valid indices are `0..param_count()`.
    fn param_count(&self) -> usize;

    /// Returns the descriptor for the parameter at `index`, or `None` if out
    /// of range.
    fn param_info(&self, index: usize) -> Option<&ParamDescriptor>;

    /// Gets the current value of the parameter at `index`.
    fn get_param(&self, index: usize) -> f32;

    /// Sets the value of the parameter at `index`.
    fn set_param(&mut self, index: usize, value: f32);

    /// Finds a parameter index by name (case-insensitive).
    fn find_param_by_name(&self, name: &str) -> Option<usize> {
        (0..self.param_count())
            .find(|&i| self.param_info(i).is_some_and(|d| d.name.eq_ignore_ascii_case(name)))
    }
}

/// Describes a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Parameter name as reported by the module.
    pub name: String,
    /// Minimum allowed value.
    pub min: f32,
    /// Maximum allowed value.
    pub max: f32,
    /// Default value.
    pub default: f32,
}

impl ParamDescriptor {
    /// A normalized \[0.0, 1.0\] parameter, default 0.5. This is the shape
    /// every hosted module parameter takes.
    pub fn normalized(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min: 0.0,
            max: 1.0,
            default: 0.5,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, default: f32) -> Self {
        self.default = default;
        self
    }

    /// Clamps a value to this parameter's valid range.
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}
