use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CNNForgeError, Result};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolMethod {
    #[default]
    Max,
    Ave,
    Stochastic,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NormRegion {
    #[default]
    AcrossChannels,
    WithinChannel,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EltwiseOp {
    Prod,
    #[default]
    Sum,
    Max,
}

/// Convolution parameters. Kernel, stride, pad and dilation accept either a
/// single broadcast value or one value per spatial axis; `_h`/`_w` variants
/// are mutually exclusive with the list form.
#[derive(Debug, Deserialize, Clone)]
pub struct ConvParam {
    #[serde(default)]
    pub num_output: usize,
    #[serde(default)]
    pub kernel_size: Vec<usize>,
    #[serde(default)]
    pub kernel_h: usize,
    #[serde(default)]
    pub kernel_w: usize,
    #[serde(default)]
    pub stride: Vec<usize>,
    #[serde(default)]
    pub stride_h: usize,
    #[serde(default)]
    pub stride_w: usize,
    #[serde(default)]
    pub pad: Vec<usize>,
    #[serde(default)]
    pub pad_h: usize,
    #[serde(default)]
    pub pad_w: usize,
    #[serde(default)]
    pub dilation: Vec<usize>,
    #[serde(default = "default_group")]
    pub group: usize,
    #[serde(default = "default_true")]
    pub bias_term: bool,
}

impl Default for ConvParam {
    fn default() -> Self {
        Self {
            num_output: 0,
            kernel_size: Vec::new(),
            kernel_h: 0,
            kernel_w: 0,
            stride: Vec::new(),
            stride_h: 0,
            stride_w: 0,
            pad: Vec::new(),
            pad_h: 0,
            pad_w: 0,
            dilation: Vec::new(),
            group: default_group(),
            bias_term: default_true(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PoolParam {
    #[serde(default)]
    pub pool: PoolMethod,
    #[serde(default)]
    pub kernel_size: usize,
    #[serde(default)]
    pub kernel_h: usize,
    #[serde(default)]
    pub kernel_w: usize,
    #[serde(default)]
    pub pad: usize,
    #[serde(default)]
    pub pad_h: usize,
    #[serde(default)]
    pub pad_w: usize,
    #[serde(default)]
    pub stride: usize,
    #[serde(default)]
    pub stride_h: usize,
    #[serde(default)]
    pub stride_w: usize,
    #[serde(default)]
    pub global_pooling: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LrnParam {
    #[serde(default = "default_local_size")]
    pub local_size: usize,
    #[serde(default = "default_one")]
    pub alpha: f32,
    #[serde(default = "default_lrn_beta")]
    pub beta: f32,
    #[serde(default = "default_one")]
    pub k: f32,
    #[serde(default)]
    pub norm_region: NormRegion,
}

impl Default for LrnParam {
    fn default() -> Self {
        Self {
            local_size: default_local_size(),
            alpha: default_one(),
            beta: default_lrn_beta(),
            k: default_one(),
            norm_region: NormRegion::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct InnerProductParam {
    #[serde(default)]
    pub num_output: usize,
    #[serde(default = "default_true")]
    pub bias_term: bool,
    #[serde(default = "default_ip_axis")]
    pub axis: isize,
}

impl Default for InnerProductParam {
    fn default() -> Self {
        Self {
            num_output: 0,
            bias_term: default_true(),
            axis: default_ip_axis(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct EltwiseParam {
    #[serde(default)]
    pub operation: EltwiseOp,
    /// One scalar per input for SUM; empty means all 1.0.
    #[serde(default)]
    pub coeff: Vec<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PowerParam {
    #[serde(default = "default_one")]
    pub power: f32,
    #[serde(default = "default_one")]
    pub scale: f32,
    #[serde(default)]
    pub shift: f32,
}

impl Default for PowerParam {
    fn default() -> Self {
        Self {
            power: 1.0,
            scale: 1.0,
            shift: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReluParam {
    #[serde(default)]
    pub negative_slope: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DropoutParam {
    #[serde(default = "default_dropout_ratio")]
    pub dropout_ratio: f32,
}

impl Default for DropoutParam {
    fn default() -> Self {
        Self {
            dropout_ratio: default_dropout_ratio(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SoftmaxParam {
    #[serde(default = "default_softmax_axis")]
    pub axis: isize,
}

impl Default for SoftmaxParam {
    fn default() -> Self {
        Self {
            axis: default_softmax_axis(),
        }
    }
}

fn default_group() -> usize {
    1
}
fn default_true() -> bool {
    true
}
fn default_local_size() -> usize {
    5
}
fn default_one() -> f32 {
    1.0
}
fn default_lrn_beta() -> f32 {
    0.75
}
fn default_ip_axis() -> isize {
    1
}
fn default_dropout_ratio() -> f32 {
    0.5
}
fn default_softmax_axis() -> isize {
    -1
}

/// An externally-decoded weight record: either legacy 4-D dims (used when
/// any is nonzero) or an explicit dim list, plus flat value/gradient
/// payloads.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct BlobConfig {
    #[serde(default)]
    pub num: usize,
    #[serde(default)]
    pub channels: usize,
    #[serde(default)]
    pub height: usize,
    #[serde(default)]
    pub width: usize,
    #[serde(default)]
    pub shape: Vec<usize>,
    #[serde(default)]
    pub data: Vec<f32>,
    #[serde(default)]
    pub diff: Vec<f32>,
}

/// One layer descriptor: type tag, name, tensor-name bindings, the
/// type-specific parameter record, and zero or more weight records.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LayerConfig {
    #[serde(rename = "type", default)]
    pub type_tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bottom: Vec<String>,
    #[serde(default)]
    pub top: Vec<String>,
    pub convolution_param: Option<ConvParam>,
    pub pooling_param: Option<PoolParam>,
    pub lrn_param: Option<LrnParam>,
    pub inner_product_param: Option<InnerProductParam>,
    pub eltwise_param: Option<EltwiseParam>,
    pub power_param: Option<PowerParam>,
    pub relu_param: Option<ReluParam>,
    pub dropout_param: Option<DropoutParam>,
    pub softmax_param: Option<SoftmaxParam>,
    #[serde(default)]
    pub blobs: Vec<BlobConfig>,
}

/// The deserialized network description: a name, the declared input
/// dimensions (batch axis first), and the ordered layer descriptors.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NetConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: Vec<String>,
    #[serde(default)]
    pub input_dim: Vec<usize>,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
}

impl NetConfig {
    /// Load a network description from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: NetConfig =
            serde_json::from_reader(reader).map_err(|e| CNNForgeError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that do not need a built layer.
    pub fn validate(&self) -> Result<()> {
        for layer in &self.layers {
            if layer.name.is_empty() {
                return Err(CNNForgeError::InvalidParam(
                    "layer descriptor without a name".into(),
                ));
            }
            if layer.type_tag.is_empty() {
                return Err(CNNForgeError::InvalidParam(format!(
                    "layer '{}' has no type tag",
                    layer.name
                )));
            }
        }
        Ok(())
    }
}
