//! ---
//! cep_section: "02-ingestion"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Ingestion crate exports."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
//! Raw-to-staging normalisation of capital project schedules and the
//! project-to-machine asset bridge.

pub mod assets;
pub mod errors;
pub mod staging;

pub use assets::{
    asset_tag_for, AssetRecord, AssetRegistry, AssetRegistryFile, ASSET_TAG_PREFIX,
    DEFAULT_ASSET_TYPE,
};
pub use errors::{IngestError, Result};
pub use staging::{
    load_schedule, normalize_schedule, parse_schedule_date, read_staging, write_staging,
    ProjectRecord,
};
