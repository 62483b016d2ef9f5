pub mod composer;
pub mod credentials;
pub mod csv_source;
pub mod lookup;
pub mod template;

pub use composer::FileDraftComposer;
pub use credentials::{EnvCredentialProvider, StaticCredentialProvider};
pub use csv_source::{list_csv_files, CsvRecordSource};
pub use lookup::{probe_connection, ConnectionStatus, HttpEmailLookup};
pub use template::{list_template_files, FileTemplateInspector};
