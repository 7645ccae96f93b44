//! Elementwise non-linearities: ReLU, Sigmoid, TanH and the generic power
//! transform.

use crate::config::{LayerConfig, PowerParam};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

use super::Layer;

fn first<'a>(bottom: &'a [Blob], layer: &str) -> Result<&'a Blob> {
    bottom
        .first()
        .ok_or_else(|| CNNForgeError::InvalidParam(format!("{layer}: forward without input")))
}

/// Rectified linear unit `max(x, 0) + negative_slope * min(x, 0)`.
pub struct ReluLayer {
    negative_slope: f32,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl ReluLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let negative_slope = config
            .relu_param
            .as_ref()
            .map(|p| p.negative_slope)
            .unwrap_or(0.0);
        Ok(Self {
            negative_slope,
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for ReluLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = first(bottom, "relu")?;
        let slope = self.negative_slope;
        let data = input
            .data()
            .iter()
            .map(|&x| x.max(0.0) + slope * x.min(0.0))
            .collect();
        let top = Blob::from_parts(input.shape(), data)?;
        log::trace!("{} {} -> {}", self.name, input, top);
        Ok(vec![top])
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

/// Sigmoid non-linearity `1 / (1 + e^-x)`. The gradient vanishes away from
/// zero; ReLU is usually the better choice in deep stacks.
pub struct SigmoidLayer {
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl SigmoidLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for SigmoidLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = first(bottom, "sigmoid")?;
        let data = input
            .data()
            .iter()
            .map(|&x| 1.0 / (1.0 + (-x).exp()))
            .collect();
        Ok(vec![Blob::from_parts(input.shape(), data)?])
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

/// Hyperbolic tangent `(1 - e^-2x) / (1 + e^-2x)`.
pub struct TanhLayer {
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl TanhLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            bottom: config.bottom.clone(),
            top: config.top.clone(),
        })
    }
}

impl Layer for TanhLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = first(bottom, "tanh")?;
        let data = input
            .data()
            .iter()
            .map(|&x| {
                let e = (-2.0 * x).exp();
                (1.0 - e) / (1.0 + e)
            })
            .collect();
        Ok(vec![Blob::from_parts(input.shape(), data)?])
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

/// Generic power transform `y = (shift + scale * x) ^ power`.
pub struct PowerLayer {
    power: f32,
    scale: f32,
    shift: f32,
    diff_scale: f32,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

impl PowerLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .power_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("power_param".into()))?;
        let mut layer = Self::from_param(&config.name, param);
        layer.bottom = config.bottom.clone();
        layer.top = config.top.clone();
        Ok(layer)
    }

    pub fn from_param(name: &str, param: &PowerParam) -> Self {
        Self {
            power: param.power,
            scale: param.scale,
            shift: param.shift,
            diff_scale: param.power * param.scale,
            name: name.to_string(),
            bottom: Vec::new(),
            top: Vec::new(),
        }
    }
}

impl Layer for PowerLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = first(bottom, "power")?;

        // When scale or power is zero the input never matters: the output is
        // the constant shift^power (1 when power is zero).
        if self.diff_scale == 0.0 {
            let value = if self.power == 0.0 {
                1.0
            } else {
                self.shift.powf(self.power)
            };
            return Ok(vec![Blob::filled(input.shape(), value)?]);
        }

        let mut top = input.clone();
        if self.scale != 1.0 {
            top.scale(self.scale);
        }
        if self.shift != 0.0 {
            top.shift(self.shift);
        }
        if self.power != 1.0 {
            top.powx(self.power);
        }
        Ok(vec![top])
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
