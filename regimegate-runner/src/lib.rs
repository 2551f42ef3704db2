//! RegimeGate Runner: pipeline orchestration, decisions, tuning, artifacts.
//!
//! This crate builds on `regimegate-core` to provide:
//! - TOML pipeline configuration with content-addressed run IDs
//! - The decision collaborator (rule table, optional fallback hardening)
//! - The JSONL decision log with an injectable clock
//! - The regime-adaptive pipeline: baseline run, per-regime runs, stitching
//!   and aggregation
//! - Parallel random-search tuning
//! - Single-validator runs over synthetic or CSV prices
//! - CSV/JSON artifact export

pub mod config;
pub mod decision;
pub mod decision_log;
pub mod export;
pub mod optimizer;
pub mod pipeline;
pub mod single;

pub use config::{
    short_run_id, ConfigError, PipelineConfig, PositionConfig, RunId, ValidatorParams,
};
pub use decision::{
    Decider, Decision, DecisionContext, DecisionError, FallbackDecider, RuleBasedDecider,
};
pub use decision_log::{
    Clock, DecisionLog, DecisionRecord, DecisionSink, FixedClock, NullSink, SystemClock,
};
pub use optimizer::{random_search, score, Candidate, SearchOutcome, SearchSpace, Trial};
pub use pipeline::{
    aggregate, run_pipeline, run_to_file, stitch_equity, AggregateMetrics, PipelineError,
    PipelineResult, RegimeRun,
};
pub use single::{
    load_prices, parse_param, read_prices, PriceLoadError, SingleRunError, ValidatorRun,
    ValidatorRunResult,
};
