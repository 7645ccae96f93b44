use rayon::prelude::*;

use crate::config::{ConvParam, LayerConfig};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};
use crate::im2col::{conv_out_size, im2col};

use super::Layer;

/// 2-D convolution lowered to im2col + dense matrix multiply.
///
/// Weights are `[num_output, channels/group, kernel_h, kernel_w]`, the
/// optional bias is `[num_output]`. Each sample expands into a
/// `[(channels/group)*kh*kw, out_h*out_w]` matrix per group and is
/// multiplied by the group's weight slice.
pub struct ConvolutionLayer {
    num_output: usize,
    group: usize,
    kernel_h: usize,
    kernel_w: usize,
    stride_h: usize,
    stride_w: usize,
    pad_h: usize,
    pad_w: usize,
    dilation_h: usize,
    dilation_w: usize,
    weight: Option<Blob>,
    bias: Option<Blob>,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

/// Spatial parameters come either as one broadcast value, one value per
/// axis, or explicit `_h`/`_w` fields; the forms are mutually exclusive.
fn resolve_spatial(
    list: &[usize],
    h: usize,
    w: usize,
    default: usize,
    what: &str,
) -> Result<(usize, usize)> {
    if h != 0 || w != 0 {
        if !list.is_empty() {
            return Err(CNNForgeError::InvalidParam(format!(
                "either {what} or {what}_h/{what}_w should be specified; not both"
            )));
        }
        if h == 0 || w == 0 {
            return Err(CNNForgeError::InvalidParam(format!(
                "both {what}_h and {what}_w are required"
            )));
        }
        return Ok((h, w));
    }
    match list.len() {
        0 => Ok((default, default)),
        1 => Ok((list[0], list[0])),
        2 => Ok((list[0], list[1])),
        _ => Err(CNNForgeError::InvalidParam(format!(
            "{what} must be specified once, or once per spatial dimension"
        ))),
    }
}

impl ConvolutionLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .convolution_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("convolution_param".into()))?;
        let mut layer = Self::from_param(param)?;
        layer.name = config.name.clone();
        layer.bottom = config.bottom.clone();
        layer.top = config.top.clone();

        if !config.blobs.is_empty() {
            layer.weight = Some(Blob::from_config(&config.blobs[0])?);
            if param.bias_term {
                let bias_config = config.blobs.get(1).ok_or_else(|| {
                    CNNForgeError::MissingParam("convolution bias blob".into())
                })?;
                layer.bias = Some(Blob::from_config(bias_config)?);
            }
        }
        Ok(layer)
    }

    pub fn from_param(param: &ConvParam) -> Result<Self> {
        if param.num_output == 0 {
            return Err(CNNForgeError::InvalidParam(
                "convolution num_output must be positive".into(),
            ));
        }
        let (kernel_h, kernel_w) = resolve_spatial(
            &param.kernel_size,
            param.kernel_h,
            param.kernel_w,
            0,
            "kernel_size",
        )?;
        if kernel_h == 0 || kernel_w == 0 {
            return Err(CNNForgeError::InvalidParam(
                "filter dimensions must be nonzero".into(),
            ));
        }
        let (stride_h, stride_w) = resolve_spatial(
            &param.stride,
            param.stride_h,
            param.stride_w,
            1,
            "stride",
        )?;
        if stride_h == 0 || stride_w == 0 {
            return Err(CNNForgeError::InvalidParam(
                "stride dimensions must be nonzero".into(),
            ));
        }
        let (pad_h, pad_w) = resolve_spatial(&param.pad, param.pad_h, param.pad_w, 0, "pad")?;
        let (dilation_h, dilation_w) =
            resolve_spatial(&param.dilation, 0, 0, 1, "dilation")?;
        if dilation_h == 0 || dilation_w == 0 {
            return Err(CNNForgeError::InvalidParam(
                "dilation dimensions must be nonzero".into(),
            ));
        }
        if param.group == 0 {
            return Err(CNNForgeError::InvalidParam(
                "convolution group must be positive".into(),
            ));
        }
        if param.num_output % param.group != 0 {
            return Err(CNNForgeError::InvalidParam(
                "number of outputs must be a multiple of group".into(),
            ));
        }

        Ok(Self {
            num_output: param.num_output,
            group: param.group,
            kernel_h,
            kernel_w,
            stride_h,
            stride_w,
            pad_h,
            pad_w,
            dilation_h,
            dilation_w,
            weight: None,
            bias: None,
            name: String::new(),
            bottom: Vec::new(),
            top: Vec::new(),
        })
    }
}

impl Layer for ConvolutionLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom.first().ok_or_else(|| {
            CNNForgeError::InvalidParam("convolution: forward without input".into())
        })?;
        if input.axes_num() != 4 {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![4],
                actual: vec![input.axes_num()],
            });
        }
        let weight = self
            .weight
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("convolution weights".into()))?;

        let num = input.num()?;
        let channels = input.channels()?;
        let height = input.height()?;
        let width = input.width()?;
        if channels % self.group != 0 {
            return Err(CNNForgeError::InvalidParam(format!(
                "channels {} not divisible by group {}",
                channels, self.group
            )));
        }

        let out_h = conv_out_size(height, self.kernel_h, self.pad_h, self.stride_h, self.dilation_h)?;
        let out_w = conv_out_size(width, self.kernel_w, self.pad_w, self.stride_w, self.dilation_w)?;

        let group_in = channels / self.group;
        let group_out = self.num_output / self.group;
        let kernel_dim = group_in * self.kernel_h * self.kernel_w;
        let spatial = out_h * out_w;

        if weight.capacity() != self.num_output * kernel_dim {
            return Err(CNNForgeError::CountMismatch {
                expected: self.num_output * kernel_dim,
                actual: weight.capacity(),
            });
        }
        if let Some(bias) = &self.bias {
            if bias.capacity() != self.num_output {
                return Err(CNNForgeError::CountMismatch {
                    expected: self.num_output,
                    actual: bias.capacity(),
                });
            }
        }

        let in_data = input.data();
        let w_data = weight.data();
        let sample_in = channels * height * width;
        let sample_out = self.num_output * spatial;

        let mut out_data = vec![0.0f32; num * sample_out];
        // Samples are independent; spread them across the pool.
        out_data
            .par_chunks_mut(sample_out)
            .enumerate()
            .try_for_each(|(n, out_chunk)| -> Result<()> {
                for g in 0..self.group {
                    let in_start = n * sample_in + g * group_in * height * width;
                    let cols = im2col(
                        &in_data[in_start..in_start + group_in * height * width],
                        group_in,
                        height,
                        width,
                        self.kernel_h,
                        self.kernel_w,
                        self.pad_h,
                        self.pad_w,
                        self.stride_h,
                        self.stride_w,
                        self.dilation_h,
                        self.dilation_w,
                    )?;
                    let col_blob = Blob::from_parts(&[1, 1, kernel_dim, spatial], cols)?;

                    let w_start = g * group_out * kernel_dim;
                    let w_blob = Blob::from_parts(
                        &[1, 1, group_out, kernel_dim],
                        w_data[w_start..w_start + group_out * kernel_dim].to_vec(),
                    )?;

                    let mut out = w_blob.mmul(&col_blob)?;
                    if let Some(bias) = &self.bias {
                        let bias_col = Blob::from_parts(
                            &[1, 1, group_out, 1],
                            bias.data()[g * group_out..(g + 1) * group_out].to_vec(),
                        )?;
                        let ones = Blob::filled(&[1, 1, 1, spatial], 1.0)?;
                        out.add(&bias_col.mmul(&ones)?)?;
                    }

                    out_chunk[g * group_out * spatial..(g + 1) * group_out * spatial]
                        .copy_from_slice(out.data());
                }
                Ok(())
            })?;

        let top = Blob::from_parts(&[num, self.num_output, out_h, out_w], out_data)?;
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
