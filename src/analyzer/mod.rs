//! # Analyzer Module
//!
//! Manifest analyzers. Currently only SCC-Lint, which checks
//! SecurityContextConstraints against the workloads they admit.

pub mod scclint;
