pub mod assembler;
pub mod engine;
pub mod matcher;
pub mod normalize;
pub mod session;
pub mod transform;

pub use crate::domain::model::{Field, FieldMapping, Placeholder, Record, RecordSet, Template};
pub use crate::domain::ports::{
    ConfigProvider, CredentialProvider, DraftComposer, EmailLookup, RecordSource,
    TemplateInspector,
};
pub use crate::utils::error::Result;
