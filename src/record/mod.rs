//! Financial records: storage, the field allow-list, and the CRUD endpoints.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod delete_multiple_endpoint;
mod list_endpoint;
mod schema;
mod update_endpoint;

pub use self::core::{FinancialRecord, RecordId, create_record_table};
pub use create_endpoint::create_record_endpoint;
pub use delete_endpoint::delete_record_endpoint;
pub use delete_multiple_endpoint::delete_multiple_records_endpoint;
pub use list_endpoint::list_records_endpoint;
pub use schema::{FieldKind, FieldSpec, RecordSchema};
pub use update_endpoint::update_record_endpoint;
