// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the shared task registry / results store ([`store`])
//! - the fixed-size worker pool and the initial dispatcher ([`pool`])
//! - the single-owner result processor that releases dependents
//!   ([`processor`])
//! - the public [`Scheduler`] façade owning the lifecycle ([`scheduler`])
//! - summary and text rendering of results ([`report`])
//!
//! Communication between the dispatch side and the workers happens only
//! through the ready-queue and the results channel.

pub mod pool;
pub mod processor;
pub mod report;
pub mod scheduler;
pub mod store;

pub use report::{render_result, render_summary, Summary};
pub use scheduler::{Scheduler, SchedulerOptions};
