//! Blob area on the local filesystem

pub mod fs_blob_area;

pub use fs_blob_area::FsBlobArea;
