//! Forward-only CNN inference engine.
//!
//! A deserialized network description plus trained weights become an
//! ordered chain of computation layers; a forward pass threads blobs
//! through the chain in declaration order and yields the output tensors
//! (e.g. class probabilities). Training, autodiff and GPU kernels are out
//! of scope.

pub mod config;
pub mod core;
pub mod error;
pub mod im2col;
pub mod loader;
pub mod net;
pub mod nn;

pub use config::NetConfig;
pub use core::blob::{Blob, TopValue};
pub use error::{CNNForgeError, Result};
pub use net::Net;
pub use nn::LayerRegistry;
