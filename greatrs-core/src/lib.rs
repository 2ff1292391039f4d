//! Automated GREAT enrichment analysis.
//!
//! This crate drives one analysis round-trip against the GREAT web service
//! (<https://great.stanford.edu>): it normalizes genomic region input into
//! the BED column layout GREAT expects, pastes it into the submission form
//! through a headless browser, waits for the server-side job, and scrapes
//! the requested result back out (gene associations, enrichment tables,
//! distance plots, or a UCSC browser handoff).
//!
//! # Example
//!
//! ```no_run
//! use greatrs_core::config::{AnalysisOptions, Assembly, Output};
//! use greatrs_core::format::{format_regions, BedColumns, RegionInput};
//! use greatrs_core::analysis::run_analysis;
//!
//! let rows = vec![
//!     vec!["chr1".to_string(), "100".to_string(), "200".to_string()],
//!     vec!["chr2".to_string(), "300".to_string(), "400".to_string()],
//! ];
//! let regions = format_regions(RegionInput::from(rows), &BedColumns::default()).unwrap();
//!
//! let opts = AnalysisOptions {
//!     assembly: Assembly::Mm10,
//!     output: Output::GoProcess,
//!     ..Default::default()
//! };
//! let result = run_analysis(&regions, None, &opts).unwrap();
//! ```

pub mod analysis;
pub mod artifacts;
pub mod config;
pub mod errors;
pub mod format;
pub mod models;
pub mod scrape;
pub mod session;
pub mod site;

// re-exports
pub use self::analysis::{run_analysis, AnalysisOutput};
pub use self::config::AnalysisOptions;
pub use self::errors::GreatError;
pub use self::format::{format_regions, BedColumns, RegionInput};
pub use self::models::RegionSet;
