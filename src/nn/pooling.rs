use crate::config::{LayerConfig, PoolMethod, PoolParam};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};
use crate::im2col::conv_out_size;

use super::Layer;

/// Spatial pooling over rank-4 inputs. MAX takes the window maximum, AVE
/// divides the window sum by the clipped window area. Stochastic pooling is
/// not supported.
pub struct PoolingLayer {
    method: PoolMethod,
    global: bool,
    kernel_h: usize,
    kernel_w: usize,
    pad_h: usize,
    pad_w: usize,
    stride_h: usize,
    stride_w: usize,
    name: String,
    bottom: Vec<String>,
    top: Vec<String>,
}

fn resolve_pair(
    scalar: usize,
    h: usize,
    w: usize,
    default: usize,
    what: &str,
) -> Result<(usize, usize)> {
    if h != 0 || w != 0 {
        if scalar != 0 {
            return Err(CNNForgeError::InvalidParam(format!(
                "{what} is {what} OR {what}_h and {what}_w; not both"
            )));
        }
        if h == 0 || w == 0 {
            return Err(CNNForgeError::InvalidParam(format!(
                "both {what}_h and {what}_w are required"
            )));
        }
        Ok((h, w))
    } else if scalar != 0 {
        Ok((scalar, scalar))
    } else {
        Ok((default, default))
    }
}

impl PoolingLayer {
    pub fn from_config(config: &LayerConfig) -> Result<Self> {
        let param = config
            .pooling_param
            .as_ref()
            .ok_or_else(|| CNNForgeError::MissingParam("pooling_param".into()))?;
        let mut layer = Self::from_param(param)?;
        layer.name = config.name.clone();
        layer.bottom = config.bottom.clone();
        layer.top = config.top.clone();
        Ok(layer)
    }

    pub fn from_param(param: &PoolParam) -> Result<Self> {
        if param.pool == PoolMethod::Stochastic {
            return Err(CNNForgeError::UnsupportedPool("STOCHASTIC".into()));
        }

        let global = param.global_pooling;
        if global && (param.kernel_size != 0 || param.kernel_h != 0 || param.kernel_w != 0) {
            return Err(CNNForgeError::InvalidParam(
                "with global_pooling the filter size cannot be specified".into(),
            ));
        }

        let (kernel_h, kernel_w) = resolve_pair(
            param.kernel_size,
            param.kernel_h,
            param.kernel_w,
            0,
            "kernel",
        )?;
        if !global && (kernel_h == 0 || kernel_w == 0) {
            return Err(CNNForgeError::InvalidParam(
                "pooling filter size is required".into(),
            ));
        }
        let (pad_h, pad_w) = resolve_pair(param.pad, param.pad_h, param.pad_w, 0, "pad")?;
        let (stride_h, stride_w) =
            resolve_pair(param.stride, param.stride_h, param.stride_w, 1, "stride")?;

        Ok(Self {
            method: param.pool,
            global,
            kernel_h,
            kernel_w,
            pad_h,
            pad_w,
            stride_h,
            stride_w,
            name: String::new(),
            bottom: Vec::new(),
            top: Vec::new(),
        })
    }
}

impl Layer for PoolingLayer {
    fn forward(&self, bottom: &[Blob]) -> Result<Vec<Blob>> {
        let input = bottom
            .first()
            .ok_or_else(|| CNNForgeError::InvalidParam("pooling: forward without input".into()))?;
        if input.axes_num() != 4 {
            return Err(CNNForgeError::ShapeMismatch {
                expected: vec![4],
                actual: vec![input.axes_num()],
            });
        }
        let num = input.num()?;
        let channels = input.channels()?;
        let height = input.height()?;
        let width = input.width()?;

        // Global pooling collapses each channel to one cell.
        let (kernel_h, kernel_w, pad_h, pad_w, stride_h, stride_w) = if self.global {
            (height, width, 0, 0, 1, 1)
        } else {
            (
                self.kernel_h,
                self.kernel_w,
                self.pad_h,
                self.pad_w,
                self.stride_h,
                self.stride_w,
            )
        };

        let mut pooled_h = conv_out_size(height, kernel_h, pad_h, stride_h, 1)?;
        let mut pooled_w = conv_out_size(width, kernel_w, pad_w, stride_w, 1)?;
        // With padding, the last pooling window must start strictly inside
        // the image, not in the padding; clip it otherwise.
        if pad_h > 0 || pad_w > 0 {
            if (pooled_h - 1) * stride_h >= height + pad_h {
                pooled_h -= 1;
            }
            if (pooled_w - 1) * stride_w >= width + pad_w {
                pooled_w -= 1;
            }
        }

        let mut top = Blob::new(&[num, channels, pooled_h, pooled_w])?;
        let in_data = input.data();

        for n in 0..num {
            for c in 0..channels {
                let in_base = (n * channels + c) * height * width;
                let out_base = (n * channels + c) * pooled_h * pooled_w;
                for ph in 0..pooled_h {
                    for pw in 0..pooled_w {
                        let h_lo = (ph * stride_h) as isize - pad_h as isize;
                        let w_lo = (pw * stride_w) as isize - pad_w as isize;
                        let h_end = (h_lo + kernel_h as isize).clamp(0, height as isize) as usize;
                        let w_end = (w_lo + kernel_w as isize).clamp(0, width as isize) as usize;
                        let h_start = h_lo.clamp(0, h_end as isize) as usize;
                        let w_start = w_lo.clamp(0, w_end as isize) as usize;

                        let out_idx = out_base + ph * pooled_w + pw;
                        match self.method {
                            PoolMethod::Max => {
                                let mut best = f32::NEG_INFINITY;
                                for h in h_start..h_end {
                                    for w in w_start..w_end {
                                        best = best.max(in_data[in_base + h * width + w]);
                                    }
                                }
                                top.data_mut()[out_idx] = best;
                            }
                            PoolMethod::Ave => {
                                let mut sum = 0.0f32;
                                for h in h_start..h_end {
                                    for w in w_start..w_end {
                                        sum += in_data[in_base + h * width + w];
                                    }
                                }
                                let area = (h_end - h_start) * (w_end - w_start);
                                top.data_mut()[out_idx] = sum / area as f32;
                            }
                            PoolMethod::Stochastic => {
                                return Err(CNNForgeError::UnsupportedPool("STOCHASTIC".into()));
                            }
                        }
                    }
                }
            }
        }

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
