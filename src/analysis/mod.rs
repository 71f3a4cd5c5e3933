// src/analysis/mod.rs
//
// The analytical core: profile aggregation, rule classification, partner
// indexing, and cluster reconstruction. Everything here is a pure
// computation over data handed in by the store layer.

pub mod cluster;
pub mod partners;
pub mod profile;
pub mod rules;
