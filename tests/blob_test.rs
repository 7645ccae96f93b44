mod common;

use cnnforge::config::BlobConfig;
use cnnforge::{Blob, CNNForgeError};
use common::make_blob;

#[test]
fn new_capacity_is_shape_product() {
    let blob = Blob::new(&[2, 3, 4]).unwrap();
    assert_eq!(blob.capacity(), 24);
    assert_eq!(blob.shape(), &[2, 3, 4]);
    assert_eq!(blob.data().len(), 24);
    assert_eq!(blob.diff().len(), 24);
    assert!(blob.data().iter().all(|&v| v == 0.0));
}

#[test]
fn zero_dimension_is_invalid() {
    assert!(matches!(
        Blob::new(&[2, 0, 3]),
        Err(CNNForgeError::InvalidShape)
    ));
}

#[test]
fn rank_above_32_is_rejected() {
    let shape = vec![1usize; 33];
    assert!(matches!(
        Blob::new(&shape),
        Err(CNNForgeError::ExceedMaxAxes)
    ));
}

#[test]
fn filled_sets_every_element() {
    let blob = Blob::filled(&[2, 2], 1.5).unwrap();
    assert!(blob.data().iter().all(|&v| v == 1.5));
}

#[test]
fn from_parts_rejects_length_mismatch() {
    let result = Blob::from_parts(&[2, 2], vec![1.0, 2.0, 3.0]);
    assert!(matches!(
        result,
        Err(CNNForgeError::CountMismatch {
            expected: 4,
            actual: 3
        })
    ));
}

#[test]
fn from_config_legacy_dims_win() {
    let config = BlobConfig {
        num: 1,
        channels: 2,
        height: 1,
        width: 2,
        data: vec![1.0, 2.0, 3.0, 4.0],
        ..BlobConfig::default()
    };
    let blob = Blob::from_config(&config).unwrap();
    assert_eq!(blob.shape(), &[1, 2, 1, 2]);
    assert_eq!(blob.data(), &[1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn from_config_explicit_shape() {
    let config = BlobConfig {
        shape: vec![3, 2],
        data: vec![0.0; 6],
        diff: vec![1.0; 6],
        ..BlobConfig::default()
    };
    let blob = Blob::from_config(&config).unwrap();
    assert_eq!(blob.shape(), &[3, 2]);
    assert_eq!(blob.diff(), &[1.0; 6]);
}

#[test]
fn from_config_rejects_payload_mismatch() {
    let config = BlobConfig {
        shape: vec![2, 2],
        data: vec![1.0, 2.0],
        ..BlobConfig::default()
    };
    assert!(Blob::from_config(&config).is_err());
}

#[test]
fn reshape_round_trips_values() {
    let blob = make_blob(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
    let reshaped = blob.reshape(&[3, 2]).unwrap();
    assert_eq!(reshaped.shape(), &[3, 2]);
    let back = reshaped.reshape(&[2, 3]).unwrap();
    assert_eq!(back.data(), blob.data());
    assert_eq!(back.shape(), blob.shape());
}

#[test]
fn reshape_rejects_capacity_change() {
    let blob = Blob::new(&[2, 3]).unwrap();
    assert!(blob.reshape(&[2, 2]).is_err());
}

#[test]
fn reshape_is_a_deep_copy() {
    let mut blob = make_blob(&[1.0, 2.0], &[2]);
    let reshaped = blob.reshape(&[1, 2]).unwrap();
    blob.set(&[0], 9.0).unwrap();
    assert_eq!(reshaped.data(), &[1.0, 2.0]);
}

#[test]
fn legacy_accessors_pad_missing_axes_with_one() {
    let blob = Blob::new(&[2, 3]).unwrap();
    assert_eq!(blob.num().unwrap(), 2);
    assert_eq!(blob.channels().unwrap(), 3);
    assert_eq!(blob.height().unwrap(), 1);
    assert_eq!(blob.width().unwrap(), 1);
}

#[test]
fn legacy_access_on_rank_5_is_fatal() {
    let blob = Blob::new(&[1, 1, 1, 1, 1]).unwrap();
    let err = blob.num().unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn offset_is_row_major_for_in_range_indices() {
    let blob = Blob::new(&[2, 3, 4]).unwrap();
    assert_eq!(blob.offset(&[0, 0, 0]).unwrap(), 0);
    assert_eq!(blob.offset(&[1, 2, 3]).unwrap(), 23);
    assert_eq!(blob.offset(&[1, 0, 2]).unwrap(), 14);
    // Shorter index vectors address the leading axes.
    assert_eq!(blob.offset(&[1]).unwrap(), 12);
}

#[test]
fn offset_clamps_out_of_range_indices_to_axis_origin() {
    // Legacy callers address size-1 axes with index 1; those indices must
    // contribute nothing.
    let blob = Blob::new(&[1, 1, 1, 4]).unwrap();
    assert_eq!(blob.offset(&[1, 1, 1, 2]).unwrap(), 2);
    assert_eq!(blob.offset(&[1, 1, 1, 0]).unwrap(), 0);
    // An index past the axis extent also falls back to the origin.
    let blob = Blob::new(&[2, 3]).unwrap();
    assert_eq!(blob.offset(&[1, 7]).unwrap(), 3);
}

#[test]
fn oversized_index_vector_is_fatal() {
    let blob = Blob::new(&[2, 2]).unwrap();
    let err = blob.offset(&[0, 0, 0]).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn canonical_axis_wraps_negative_indices() {
    let blob = Blob::new(&[2, 3, 4, 5]).unwrap();
    assert_eq!(blob.canonical_axis(-1).unwrap(), 3);
    assert_eq!(blob.canonical_axis(-4).unwrap(), 0);
    assert_eq!(blob.canonical_axis(2).unwrap(), 2);
    assert!(blob.canonical_axis(4).is_err());
    assert!(blob.canonical_axis(-5).is_err());
}

#[test]
fn get_set_round_trip() {
    let mut blob = Blob::new(&[1, 2, 2, 2]).unwrap();
    blob.set(&[0, 1, 0, 1], 7.5).unwrap();
    assert_eq!(blob.get(&[0, 1, 0, 1]).unwrap(), 7.5);
    assert_eq!(blob.data()[5], 7.5);
}

#[test]
fn range_extracts_sub_blob() {
    let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
    let blob = make_blob(&data, &[1, 1, 4, 4]);
    let sub = blob.range(&[0, 0, 1, 1], &[1, 1, 3, 3]).unwrap();
    assert_eq!(sub.shape(), &[1, 1, 2, 2]);
    assert_eq!(sub.data(), &[5.0, 6.0, 9.0, 10.0]);
}

#[test]
fn range_requires_rank_4() {
    let blob = Blob::new(&[4, 4]).unwrap();
    assert!(blob.range(&[0, 0, 0, 0], &[1, 1, 2, 2]).is_err());
}

#[test]
fn shape_equals_compares_full_shape() {
    let a = Blob::new(&[2, 3]).unwrap();
    let b = Blob::new(&[2, 3]).unwrap();
    let c = Blob::new(&[3, 2]).unwrap();
    assert!(a.shape_equals(&b));
    assert!(!a.shape_equals(&c));
}
