//! Ingestion collaborators: boundary/road-network fetching from OSM services
//! and hourly precipitation fetching from the Open-Meteo archive. Each run
//! writes an immutable dated snapshot.

pub mod error;
pub mod geodata;
pub mod weather;
