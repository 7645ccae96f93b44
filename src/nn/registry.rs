use std::collections::HashMap;

use crate::config::LayerConfig;
use crate::error::{CNNForgeError, Result};

use super::{
    ConvolutionLayer, DropoutLayer, EltwiseLayer, InnerProductLayer, Layer, LrnLayer,
    PoolingLayer, PowerLayer, ReluLayer, SigmoidLayer, SoftmaxLayer, SplitLayer, TanhLayer,
};

pub type Creator = fn(&LayerConfig) -> Result<Box<dyn Layer>>;

/// Maps a layer type tag to its constructor. An explicit instance is passed
/// into the network constructor, so tests can register stub layers on a
/// fresh registry.
pub struct LayerRegistry {
    creators: HashMap<String, Creator>,
}

impl LayerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            creators: HashMap::new(),
        }
    }

    /// A registry with the standard layer set registered.
    pub fn with_defaults() -> Self {
        let defaults: [(&str, Creator); 12] = [
            ("CONVOLUTION", create_convolution),
            ("POOLING", create_pooling),
            ("LRN", create_lrn),
            ("INNER_PRODUCT", create_inner_product),
            ("ELTWISE", create_eltwise),
            ("RELU", create_relu),
            ("SIGMOID", create_sigmoid),
            ("TANH", create_tanh),
            ("POWER", create_power),
            ("SOFTMAX", create_softmax),
            ("DROPOUT", create_dropout),
            ("SPLIT", create_split),
        ];
        let mut registry = Self::new();
        for (tag, creator) in defaults {
            registry.creators.insert(tag.to_string(), creator);
        }
        registry
    }

    /// Register a constructor under a type tag. Re-registering a tag is an
    /// error.
    pub fn register(&mut self, tag: &str, creator: Creator) -> Result<()> {
        if self.creators.contains_key(tag) {
            return Err(CNNForgeError::DuplicateLayerType(tag.to_string()));
        }
        self.creators.insert(tag.to_string(), creator);
        Ok(())
    }

    /// Build a layer instance from its descriptor. Unknown tags are an
    /// error, not a silent skip.
    pub fn create(&self, config: &LayerConfig) -> Result<Box<dyn Layer>> {
        let creator = self
            .creators
            .get(&config.type_tag)
            .ok_or_else(|| CNNForgeError::UnknownLayerType(config.type_tag.clone()))?;
        log::debug!("creating layer {} ({})", config.name, config.type_tag);
        creator(config)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.creators.contains_key(tag)
    }

    /// Registered tags, sorted for stable diagnostics.
    pub fn type_list(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn create_convolution(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(ConvolutionLayer::from_config(config)?))
}

fn create_pooling(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(PoolingLayer::from_config(config)?))
}

fn create_lrn(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(LrnLayer::from_config(config)?))
}

fn create_inner_product(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(InnerProductLayer::from_config(config)?))
}

fn create_eltwise(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(EltwiseLayer::from_config(config)?))
}

fn create_relu(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(ReluLayer::from_config(config)?))
}

fn create_sigmoid(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(SigmoidLayer::from_config(config)?))
}

fn create_tanh(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(TanhLayer::from_config(config)?))
}

fn create_power(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(PowerLayer::from_config(config)?))
}

fn create_softmax(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(SoftmaxLayer::from_config(config)?))
}

fn create_dropout(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(DropoutLayer::from_config(config)?))
}

fn create_split(config: &LayerConfig) -> Result<Box<dyn Layer>> {
    Ok(Box::new(SplitLayer::from_config(config)?))
}
