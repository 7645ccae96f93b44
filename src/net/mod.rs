//! The network executor: an ordered layer chain built from a description,
//! with a name index for re-binding trained layers.

use std::collections::HashMap;
use std::path::Path;

use crate::config::NetConfig;
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};
use crate::nn::{Layer, LayerRegistry};

/// An instantiated network. Layers execute strictly in declaration order;
/// each layer's entire output list becomes the next layer's input list.
pub struct Net {
    name: String,
    input: Vec<String>,
    input_dim: Vec<usize>,
    layers: Vec<Box<dyn Layer>>,
    layer_types: Vec<String>,
    index: HashMap<String, usize>,
}

impl Net {
    /// Build a net from a description. Descriptors with an empty `top` list
    /// (pure data sources) are skipped; any layer construction failure
    /// aborts the build.
    pub fn new(config: &NetConfig, registry: &LayerRegistry) -> Result<Self> {
        if config.input_dim.is_empty() {
            return Err(CNNForgeError::MissingInputDim);
        }

        let mut layers = Vec::new();
        let mut layer_types = Vec::new();
        let mut index = HashMap::new();
        for layer_config in &config.layers {
            if layer_config.top.is_empty() {
                continue;
            }
            let layer = registry.create(layer_config)?;
            index.insert(layer_config.name.clone(), layers.len());
            layer_types.push(layer_config.type_tag.clone());
            layers.push(layer);
        }

        Ok(Self {
            name: config.name.clone(),
            input: config.input.clone(),
            input_dim: config.input_dim.clone(),
            layers,
            layer_types,
            index,
        })
    }

    /// Load a description from a JSON file and build the net.
    pub fn from_file<P: AsRef<Path>>(path: P, registry: &LayerRegistry) -> Result<Self> {
        let config = NetConfig::load(path)?;
        Self::new(&config, registry)
    }

    /// Re-bind trained layers: every weight-bearing descriptor replaces the
    /// instance at its declared name's position. Descriptors without a
    /// matching position are logged and skipped.
    pub fn copy_trained_from(&mut self, config: &NetConfig, registry: &LayerRegistry) -> Result<()> {
        for layer_config in &config.layers {
            if layer_config.type_tag == "DATA" || layer_config.top.is_empty() {
                continue;
            }
            let layer = registry.create(layer_config)?;
            match self.index.get(layer.name()) {
                Some(&position) => self.layers[position] = layer,
                None => log::warn!(
                    "layer '{}' not declared in net '{}', skipping",
                    layer.name(),
                    self.name
                ),
            }
        }
        Ok(())
    }

    pub fn copy_trained_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        registry: &LayerRegistry,
    ) -> Result<()> {
        let config = NetConfig::load(path)?;
        self.copy_trained_from(&config, registry)
    }

    /// Run the full forward pass.
    pub fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        self.forward_to(bottom, self.layers.len())
    }

    /// Run the forward pass, stopping after the layer at index `end`
    /// (inclusive). An `end` past the chain means a full pass. Useful for
    /// introspecting intermediate activations.
    pub fn forward_to(&self, bottom: &[Blob], end: usize) -> Result<Vec<Blob>> {
        let first = bottom.first().ok_or_else(|| CNNForgeError::InputShapeMismatch {
            expected: self.input_dim.clone(),
            actual: Vec::new(),
        })?;
        self.check_input_shape(first)?;

        let mut current = bottom.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            log::debug!(
                "forward {} ({}): {} -> {}",
                layer.name(),
                self.layer_types[i],
                layer.bottom().join(","),
                layer.top().join(",")
            );
            current = layer
                .forward(&current)
                .map_err(|source| CNNForgeError::LayerForward {
                    layer: layer.name().to_string(),
                    type_tag: self.layer_types[i].clone(),
                    source: Box::new(source),
                })?;
            if i >= end {
                break;
            }
        }
        Ok(current)
    }

    /// The declared input rank must match, and every axis beyond the batch
    /// axis must match exactly.
    fn check_input_shape(&self, bottom: &Blob) -> Result<()> {
        let shape = bottom.shape();
        let matches = shape.len() == self.input_dim.len()
            && shape
                .iter()
                .zip(self.input_dim.iter())
                .skip(1)
                .all(|(a, b)| a == b);
        if !matches {
            return Err(CNNForgeError::InputShapeMismatch {
                expected: self.input_dim.clone(),
                actual: shape.to_vec(),
            });
        }
        Ok(())
    }

    /// Declared input spatial size as (height, width), for the external
    /// image-preparation collaborator.
    pub fn input_size(&self) -> Result<(usize, usize)> {
        if self.input_dim.len() != 4 {
            return Err(CNNForgeError::InvalidParam(format!(
                "input_dim {:?} is not the legacy 4-axis layout",
                self.input_dim
            )));
        }
        Ok((self.input_dim[2], self.input_dim[3]))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_names(&self) -> &[String] {
        &self.input
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}
