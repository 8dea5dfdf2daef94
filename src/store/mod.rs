//! Record store: the record array plus its three ordered indexes

pub mod record;
pub mod record_store;

pub use record::{NewRecord, Record, RecordId, RecordPatch};
pub use record_store::{IndexKey, RecordStore};
