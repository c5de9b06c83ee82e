pub mod cli;
pub mod compare;
pub mod coverage;
pub mod diff;
pub mod error;
pub mod filesystem;
pub mod ingest;
pub mod memo;
pub mod model;
pub mod parsers;
pub mod ranges;
pub mod report;
pub mod status;
