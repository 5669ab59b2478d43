//! ---
//! cep_section: "11-simulation"
//! cep_subsection: "module"
//! cep_type: "source"
//! cep_scope: "code"
//! cep_description: "Input seam for the asset registry."
//! cep_version: "v0.1.0"
//! cep_owner: "tbd"
//! ---
use std::convert::Infallible;

use crate::records::Asset;

/// Supplies the ordered set of assets a run generates telemetry for.
///
/// Implementations must report an empty registry as an empty list and never
/// invent assets to fill it.
pub trait AssetSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn assets(&self) -> Result<Vec<Asset>, Self::Error>;
}

impl AssetSource for Vec<Asset> {
    type Error = Infallible;

    fn assets(&self) -> Result<Vec<Asset>, Self::Error> {
        Ok(self.clone())
    }
}

impl AssetSource for [Asset] {
    type Error = Infallible;

    fn assets(&self) -> Result<Vec<Asset>, Self::Error> {
        Ok(self.to_vec())
    }
}
