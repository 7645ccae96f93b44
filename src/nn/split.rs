use crate::config::LayerConfig;
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

/// Duplicates its single input into `count` independent copies.
pub struct SplitLayer {
    count: usize,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl SplitLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let mut layer = Self::with_count(config.top.len())?;
        layer.name = config.name.clone();
        layer.bottom = config.bottom.clone();
        layer.top = config.top.clone();
        Ok(layer)
    }

    pub fn with_count(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(CNNForgeError::InvalidParam(
                "split layer needs at least one output".into(),
            ));
        }
        Ok(Self {
            count,
            name: String::new(),
            bottom: Vec::new(),
            top: Vec::new(),
        })
    }
}

impl Layer for SplitLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom
            .first()
            .ok_or_else(|| CNNForgeError::InvalidParam("split: forward without input".into()))?;
        Ok((0..self.count).map(|_| input.clone()).collect())
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
