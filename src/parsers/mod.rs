pub mod cobertura;

use crate::error::Result;
use crate::model::CoverageData;

/// Every report parser implements this trait.
pub trait Parser {
    /// Parse the input bytes into our in-memory report model.
    fn parse(&self, input: &[u8]) -> Result<CoverageData>;
}
