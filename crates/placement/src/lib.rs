//! Career-centre placement engine: internship postings, student applications, and the
//! status machines that keep slot accounting and single-placement rules consistent.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
