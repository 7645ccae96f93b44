mod blob;
mod ops;

pub use blob::{Blob, BlobShape, MAX_BLOB_AXES};
pub use ops::TopValue;
