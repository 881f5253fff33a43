//! Insight generation and cross-provider comparison.
//!
//! Sends snapshot digests to an LLM gateway (OpenRouter) and parses the
//! response into a validated [`InsightReport`]. Generation sits behind the
//! [`GenerateInsights`] interface so the pipeline can be exercised with the
//! deterministic [`StaticGenerator`] instead of the external service. The
//! [`compare`] module ranks all configured providers against the baseline
//! using stored snapshots and reports only — no external calls.

pub mod client;
pub mod compare;
pub mod error;
pub mod generator;
pub mod prompt;
pub mod report;

pub use client::OpenRouterClient;
pub use compare::{compare_services, ComparisonResult, ProviderComparison};
pub use error::InsightError;
pub use generator::{DisabledGenerator, GenerateInsights, OpenRouterGenerator, StaticGenerator};
pub use report::{InsightPayload, InsightReport};
