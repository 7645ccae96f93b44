mod common;

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;

use cnnforge::config::{InnerProductParam, LayerConfig, NetConfig};
use cnnforge::loader::{attach_weights, load_weights};
use cnnforge::{LayerRegistry, Net};
use common::{assert_f32_near, make_blob};
use safetensors::tensor::{Dtype, TensorView};
use tempfile::tempdir;

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn load_weights_groups_blobs_by_layer() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.safetensors");

    {
        let weight_bytes = f32_bytes(&[0.0, 1.0, 1.0, 0.0, 2.0, 2.0]);
        let bias_bytes = f32_bytes(&[10.0, 20.0, 30.0]);
        let weight = TensorView::new(Dtype::F32, vec![3, 2], &weight_bytes).unwrap();
        let bias = TensorView::new(Dtype::F32, vec![3], &bias_bytes).unwrap();
        let tensors = HashMap::from([
            ("fc1.weight".to_string(), weight),
            ("fc1.bias".to_string(), bias),
        ]);
        let tensor_list: Vec<(&str, &TensorView)> =
            tensors.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let serialized = safetensors::serialize(tensor_list, &None).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(&serialized).unwrap();
    }

    let weights = load_weights(&path).unwrap();
    assert_eq!(weights.len(), 1);
    let blobs = weights.get("fc1").unwrap();
    assert_eq!(blobs.len(), 2);
    assert_eq!(blobs[0].shape(), &[3, 2]);
    assert_eq!(blobs[0].data(), &[0.0, 1.0, 1.0, 0.0, 2.0, 2.0]);
    assert_eq!(blobs[1].shape(), &[3]);
    assert_eq!(blobs[1].data(), &[10.0, 20.0, 30.0]);
}

#[test]
fn attached_weights_drive_a_forward_pass() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.safetensors");

    {
        let weight_bytes = f32_bytes(&[1.0, 0.0, 0.0, 1.0]);
        let weight = TensorView::new(Dtype::F32, vec![2, 2], &weight_bytes).unwrap();
        let bias_bytes = f32_bytes(&[5.0, -5.0]);
        let bias = TensorView::new(Dtype::F32, vec![2], &bias_bytes).unwrap();
        let tensors = HashMap::from([
            ("fc1.weight".to_string(), weight),
            ("fc1.bias".to_string(), bias),
        ]);
        let tensor_list: Vec<(&str, &TensorView)> =
            tensors.iter().map(|(k, v)| (k.as_str(), v)).collect();
        let serialized = safetensors::serialize(tensor_list, &None).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(&serialized).unwrap();
    }

    let mut config = NetConfig {
        name: "loaded".to_string(),
        input: vec!["data".to_string()],
        input_dim: vec![1, 1, 1, 2],
        layers: vec![LayerConfig {
            type_tag: "INNER_PRODUCT".to_string(),
            name: "fc1".to_string(),
            bottom: vec!["data".to_string()],
            top: vec!["fc1".to_string()],
            inner_product_param: Some(InnerProductParam {
                num_output: 2,
                bias_term: true,
                axis: 1,
            }),
            ..LayerConfig::default()
        }],
    };

    let weights = load_weights(&path).unwrap();
    attach_weights(&mut config, &weights);
    assert_eq!(config.layers[0].blobs.len(), 2);

    let registry = LayerRegistry::with_defaults();
    let net = Net::new(&config, &registry).unwrap();
    let top = net.forward(&[make_blob(&[3.0, 7.0], &[1, 1, 1, 2])]).unwrap();
    assert_f32_near(top[0].data(), &[8.0, 2.0], 1e-5, "identity + bias");
}

#[test]
fn f16_weights_convert_to_f32() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("half.safetensors");

    {
        let values: Vec<u8> = [1.0f32, -2.0, 0.5, 4.0]
            .iter()
            .flat_map(|&v| half::f16::from_f32(v).to_le_bytes())
            .collect();
        let view = TensorView::new(Dtype::F16, vec![4], &values).unwrap();
        let tensor_list = vec![("conv1.bias", &view)];
        let serialized = safetensors::serialize(tensor_list, &None).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(&serialized).unwrap();
    }

    let weights = load_weights(&path).unwrap();
    let blobs = weights.get("conv1").unwrap();
    assert_f32_near(blobs[0].data(), &[1.0, -2.0, 0.5, 4.0], 1e-3, "f16 weights");
}

#[test]
fn unconventional_tensor_names_are_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("odd.safetensors");

    {
        let bytes = f32_bytes(&[1.0]);
        let view = TensorView::new(Dtype::F32, vec![1], &bytes).unwrap();
        let tensor_list = vec![("no_suffix_here", &view)];
        let serialized = safetensors::serialize(tensor_list, &None).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(&serialized).unwrap();
    }

    let weights = load_weights(&path).unwrap();
    assert!(weights.is_empty());
}
