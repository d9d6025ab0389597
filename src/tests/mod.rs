//! Test-only modules: one file per concern rather than a single flat
//! suite.

mod fuzz;
