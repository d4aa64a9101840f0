pub mod error;
pub mod ingest;
pub mod record;
pub mod store;
pub mod value;

pub use error::{IngestError, StoreError};
pub use ingest::{load_source, seed_store};
pub use record::{fields_from_json, Fields, Record, RecordId, ID_FIELD};
pub use store::RecordStore;
pub use value::FieldValue;
