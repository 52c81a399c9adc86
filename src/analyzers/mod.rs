// src/analyzers/mod.rs
pub mod social_filter;
