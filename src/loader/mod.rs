//! Weight-file loading: safetensors tensors become weight blobs keyed by
//! layer name, ready to attach to a network description.
//!
//! Tensor naming convention: `<layer>.weight` is blob 0, `<layer>.bias` is
//! blob 1, `<layer>.w<i>` addresses slot `i` explicitly.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use half::{bf16, f16};
use memmap2::MmapOptions;
use safetensors::tensor::Dtype;
use safetensors::SafeTensors;

use crate::config::{BlobConfig, NetConfig};
use crate::core::blob::Blob;
use crate::error::{CNNForgeError, Result};

fn view_to_f32(dtype: Dtype, bytes: &[u8]) -> Result<Vec<f32>> {
    match dtype {
        Dtype::F32 => match bytemuck::try_cast_slice::<u8, f32>(bytes) {
            Ok(values) => Ok(values.to_vec()),
            // Misaligned view into the mapping; read element-wise.
            Err(_) => Ok(bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()),
        },
        Dtype::F16 => Ok(bytes
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect()),
        Dtype::BF16 => Ok(bytes
            .chunks_exact(2)
            .map(|b| bf16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect()),
        other => Err(CNNForgeError::Parse(format!(
            "unsupported weight dtype {other:?}"
        ))),
    }
}

fn weight_slot(suffix: &str) -> Option<usize> {
    match suffix {
        "weight" => Some(0),
        "bias" => Some(1),
        other => other.strip_prefix('w').and_then(|n| n.parse().ok()),
    }
}

/// Load every tensor of a safetensors file as f32 weight blobs, grouped by
/// layer name and ordered by slot. Tensors outside the naming convention
/// are logged and skipped.
pub fn load_weights<P: AsRef<Path>>(path: P) -> Result<HashMap<String, Vec<Blob>>> {
    let file = File::open(path)?;
    // SAFETY: read-only mapping of a weight file treated as an immutable
    // asset; the mapping lives only for the duration of this call.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    let tensors =
        SafeTensors::deserialize(&mmap).map_err(|e| CNNForgeError::Parse(e.to_string()))?;

    let mut grouped: HashMap<String, Vec<(usize, Blob)>> = HashMap::new();
    for (name, view) in tensors.tensors() {
        let Some((layer, suffix)) = name.rsplit_once('.') else {
            log::warn!("skipping tensor '{name}': no layer prefix");
            continue;
        };
        let Some(slot) = weight_slot(suffix) else {
            log::warn!("skipping tensor '{name}': unrecognized slot '{suffix}'");
            continue;
        };
        let data = view_to_f32(view.dtype(), view.data())?;
        let blob = Blob::from_parts(view.shape(), data)?;
        grouped.entry(layer.to_string()).or_default().push((slot, blob));
    }

    let mut weights = HashMap::new();
    for (layer, mut blobs) in grouped {
        blobs.sort_by_key(|(slot, _)| *slot);
        weights.insert(layer, blobs.into_iter().map(|(_, blob)| blob).collect());
    }
    Ok(weights)
}

/// Copy loaded weight blobs into the matching layer descriptors so the net
/// builds fully-parameterized layers. Weight groups without a matching
/// layer are logged and skipped.
pub fn attach_weights(config: &mut NetConfig, weights: &HashMap<String, Vec<Blob>>) {
    for layer in &mut config.layers {
        if let Some(blobs) = weights.get(&layer.name) {
            layer.blobs = blobs
                .iter()
                .map(|blob| BlobConfig {
                    shape: blob.shape().to_vec(),
                    data: blob.data().to_vec(),
                    ..BlobConfig::default()
                })
                .collect();
        }
    }
    for name in weights.keys() {
        if !config.layers.iter().any(|layer| &layer.name == name) {
            log::warn!("weights for '{name}' have no matching layer descriptor");
        }
    }
}
