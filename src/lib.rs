pub mod config;
pub mod form;
pub mod loader;
pub mod page;
pub mod schema;

pub use config::{CalmFormConfig, ConfigError};
pub use form::{
    FieldChanged, FieldControls, FieldValue, FormController, FormError, FormOptions, FormResult,
    FormValues, SubmitOutcome, SubmitState,
};
pub use loader::{LoadError, SchemaLoader};
pub use page::{FormPage, PageState, Route};
pub use schema::{FieldType, FormField, FormSchema, SchemaError};
