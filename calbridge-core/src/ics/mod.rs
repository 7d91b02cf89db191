//! ICS feed conversion.
//!
//! Turns the VEVENTs of an RFC 5545 document into the input records the
//! create pass consumes, or into a UTC-normalized, source-tagged calendar for
//! the host's own importer.

mod generate;
mod parse;

pub use generate::{PreparedCalendar, prepare_for_import};
pub use parse::{ConvertedCalendar, convert_calendar};
