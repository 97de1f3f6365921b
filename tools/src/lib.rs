//! Live link driver and capture inspection for the Mosketch retargeting link.
//!
//! - Drive a [`retarget::Session`] over TCP against any scene
//! - Summarize captured byte streams frame by frame
//!
//! # Design Principles
//!
//! - **Thin driver** - All protocol decisions stay in the session.
//! - **Human-readable output** - Reports print the way the status line shows them.

mod inspect;
mod link;

pub use inspect::{format_report_pretty, inspect_stream, InspectReport, PacketSummary};
pub use link::{drive, run_tcp, DriveOptions, LinkSummary, POLL_INTERVAL};
