//! Cloud provider implementations of the catalog and invoker seams.

pub mod aws;
