use crate::config::LayerConfig;
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

/// Dropout is a no-op at inference: the layer exists so trained
/// descriptions keep their declared chain, and only validates its ratio.
pub struct DropoutLayer {
    ratio: f32,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl DropoutLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .dropout_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("dropout_param".into()))?;
        if param.dropout_ratio <= 0.0 || param.dropout_ratio >= 1.0 {
            return Err(CNNForgeError::InvalidParam(format!(
                "dropout ratio {} outside (0, 1)",
                param.dropout_ratio
            )));
        }
        Ok(Self {
            ratio: param.dropout_ratio,
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for DropoutLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        log::trace!("{} passes through (train ratio {})", self.name, self.ratio);
        Ok(bottom.to_vec())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn bottom(&self) -> &[String] {
        &self.bottom
    }

    fn top(&self) -> &[String] {
        &self.top
    }
}
