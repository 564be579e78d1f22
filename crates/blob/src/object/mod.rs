//! Object-store boundary (put/get/delete + presign).
//!
//! The concrete wire protocol is out of scope; the S3 backend covers AWS and
//! S3-compatibles (Minio), the in-memory backend covers tests/dev.

pub mod in_memory;
pub mod s3;
pub mod r#trait;

pub use in_memory::InMemoryObjectStore;
pub use r#trait::ObjectStore;
pub use s3::S3ObjectStore;
