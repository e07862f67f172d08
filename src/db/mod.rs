pub mod contract;
mod provider;
pub mod schema;
mod selection;
mod uri;
mod values;

pub use provider::{ItemsProvider, Operation, OperationResult};
pub use selection::{QueryClauses, SelectionBuilder};
pub use uri::{build_dir_uri, build_item_uri, item_id, Route};
pub use values::ContentValues;
