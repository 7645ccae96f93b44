mod common;

use cnnforge::Blob;
use common::{assert_f32_near, make_blob};

#[test]
fn scale_shift_powx_exp_transform_in_place() {
    let mut blob = make_blob(&[1.0, 2.0, 3.0], &[3]);
    blob.scale(2.0);
    assert_eq!(blob.data(), &[2.0, 4.0, 6.0]);
    blob.shift(-1.0);
    assert_eq!(blob.data(), &[1.0, 3.0, 5.0]);
    blob.powx(2.0);
    assert_eq!(blob.data(), &[1.0, 9.0, 25.0]);

    let mut blob = make_blob(&[0.0, 1.0], &[2]);
    blob.exp();
    assert_f32_near(blob.data(), &[1.0, std::f32::consts::E], 1e-6, "exp");
}

#[test]
fn add_accumulates_elementwise() {
    let mut a = make_blob(&[1.0, 2.0, 3.0], &[3]);
    let b = make_blob(&[10.0, 20.0, 30.0], &[3]);
    a.add(&b).unwrap();
    assert_eq!(a.data(), &[11.0, 22.0, 33.0]);
}

#[test]
fn add_rejects_capacity_mismatch() {
    let mut a = make_blob(&[1.0, 2.0], &[2]);
    let b = make_blob(&[1.0, 2.0, 3.0], &[3]);
    assert!(a.add(&b).is_err());
}

#[test]
fn dot_is_elementwise_product() {
    let a = make_blob(&[1.0, 2.0, 3.0], &[3]);
    let b = make_blob(&[4.0, 5.0, 6.0], &[3]);
    let c = a.dot(&b).unwrap();
    assert_eq!(c.data(), &[4.0, 10.0, 18.0]);
    assert_eq!(c.shape(), &[3]);
}

#[test]
fn norms_sum_magnitudes_and_squares() {
    let blob = make_blob(&[-1.0, 2.0, -3.0], &[3]);
    assert_eq!(blob.l1_norm(), 6.0);
    // Sum of squares, not its square root.
    assert_eq!(blob.l2_norm(), 14.0);
}

#[test]
fn transpose_swaps_last_two_axes() {
    let blob = make_blob(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 1, 2, 3]);
    let t = blob.transpose().unwrap();
    assert_eq!(t.shape(), &[1, 1, 3, 2]);
    assert_eq!(t.data(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn transpose_requires_rank_4() {
    let blob = Blob::new(&[2, 3]).unwrap();
    assert!(blob.transpose().is_err());
}

#[test]
fn mmul_2x3_times_3x2() {
    // [[1,2,3],[4,5,6]] * [[7,8],[9,10],[11,12]] = [[58,64],[139,154]]
    let a = make_blob(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 1, 2, 3]);
    let b = make_blob(&[7.0, 8.0, 9.0, 10.0, 11.0, 12.0], &[1, 1, 3, 2]);
    let c = a.mmul(&b).unwrap();
    assert_eq!(c.shape(), &[1, 1, 2, 2]);
    assert_f32_near(c.data(), &[58.0, 64.0, 139.0, 154.0], 1e-4, "2x3 * 3x2");
}

#[test]
fn mmul_rejects_inner_dimension_mismatch() {
    let a = Blob::new(&[1, 1, 2, 3]).unwrap();
    let b = Blob::new(&[1, 1, 4, 2]).unwrap();
    assert!(a.mmul(&b).is_err());
}

#[test]
fn mmul_ones_vector_broadcasts_bias() {
    // ones(M,1) * bias(1,N) tiles the bias over every row.
    let ones = Blob::filled(&[1, 1, 3, 1], 1.0).unwrap();
    let bias = make_blob(&[10.0, 20.0], &[1, 1, 1, 2]);
    let tiled = ones.mmul(&bias).unwrap();
    assert_eq!(tiled.shape(), &[1, 1, 3, 2]);
    assert_eq!(tiled.data(), &[10.0, 20.0, 10.0, 20.0, 10.0, 20.0]);
}

#[test]
fn get_top_returns_k_largest_descending() {
    let blob = make_blob(&[0.1, 0.9, 0.3, 0.05], &[1, 1, 1, 4]);
    let top = blob.get_top(2).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].index, 1);
    assert_eq!(top[0].value, 0.9);
    assert_eq!(top[1].index, 2);
    assert_eq!(top[1].value, 0.3);
}

#[test]
fn get_top_clamps_k_to_width() {
    let blob = make_blob(&[0.5, 0.2], &[1, 1, 1, 2]);
    let top = blob.get_top(5).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].index, 0);
}
