pub mod object_store;
pub mod sweep;
pub mod upload;

pub use object_store::{ObjectStore, ObjectStoreError};
pub use upload::{UploadError, UploadGateway, UploadPolicy, UploadedFile};
