//! Leptos and JavaScript components.

/// Relationship graph of an IP asset.
pub mod ip_graph;
