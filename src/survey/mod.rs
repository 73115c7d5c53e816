//! Phone Survey Pipeline
//!
//! Probes Cisco IP phones through the XML pages of their embedded web
//! server and merges what each phone reports into one inventory row.
//!
//! ## Architecture
//!
//! ```text
//! addresses → SurveyRunner → DeviceProber → PageFetcher
//!                                 │
//!                                 ├─ classifier  (page → FieldMap)
//!                                 ├─ counters    (port error total, PC port speed)
//!                                 └─ diagnostics (device log lines)
//!           → BatchResult → report (CSV + unreachable list)
//! ```
//!
//! ## Rules
//! - NetworkConfiguration is mandatory; without it a phone is unreachable
//! - PortInformation and DeviceInformation failures only degrade the row
//! - One phone's failure never affects another
//! - At most `concurrency` phones are probed at once

pub mod error;
pub mod types;
pub mod traits;
pub mod schema;
pub mod xml;
pub mod classifier;
pub mod diagnostics;
pub mod counters;
pub mod fetcher;
pub mod prober;
pub mod runner;
pub mod report;

#[cfg(test)]
pub(crate) mod test_pages;

pub use error::SurveyError;
pub use types::*;
pub use traits::*;
pub use classifier::classify_page;
pub use fetcher::{HttpPageFetcher, MockPageFetcher, MockResponse};
pub use prober::{DeviceProber, ProbeSettings};
pub use runner::{new_run_id, SurveyCancel, SurveyRunner};
pub use report::{write_address_list, write_report, write_unreachable};
