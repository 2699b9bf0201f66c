//! Route handlers

pub mod alerts;
pub mod monitoring;
pub mod pools;
pub mod servers;
