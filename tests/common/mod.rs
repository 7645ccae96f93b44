use cnnforge::Blob;

/// Create a blob from an f32 slice and shape.
pub fn make_blob(data: &[f32], shape: &[usize]) -> Blob {
    Blob::from_parts(shape, data.to_vec()).expect("blob construction failed")
}

/// Assert that two f32 slices are element-wise close within a tolerance.
#[allow(dead_code)]
pub fn assert_f32_near(actual: &[f32], expected: &[f32], tolerance: f32, msg: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: length mismatch (actual={}, expected={})",
        msg,
        actual.len(),
        expected.len()
    );
    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "{}: element [{}] mismatch: actual={}, expected={}, diff={}, tolerance={}",
            msg,
            i,
            a,
            e,
            (a - e).abs(),
            tolerance
        );
    }
}
