//! Per-pod inspection pipeline: fetch, decode, filter, render

pub mod dto;
pub mod service;
