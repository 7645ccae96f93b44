//! The concrete computation layers and their registry.

use crate::core::blob::Blob;
use crate::error::Result;

pub mod activation;
pub mod conv;
pub mod dropout;
pub mod eltwise;
pub mod inner_product;
pub mod lrn;
pub mod pooling;
pub mod registry;
pub mod softmax;
pub mod split;

pub use activation::{PowerLayer, ReluLayer, SigmoidLayer, TanhLayer};
pub use conv::ConvolutionLayer;
pub use dropout::DropoutLayer;
pub use eltwise::EltwiseLayer;
pub use inner_product::InnerProductLayer;
pub use lrn::LrnLayer;
pub use pooling::PoolingLayer;
pub use registry::LayerRegistry;
pub use softmax::SoftmaxLayer;
pub use split::SplitLayer;

/// A computation step in the network: consumes the previous step's output
/// blobs read-only and produces fresh output blobs.
pub trait Layer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>>;

    /// Declared layer name from the description. The net re-binds trained
    /// layer instances by it.
    fn name(&self) -> &str;

    /// Declared input tensor names.
    fn bottom(&self) -> &[String];

    /// Declared output tensor names.
    fn top(&self) -> &[String];
}
