//! Integration tests for margin

mod annotate_flow;
mod cli_smoke;
mod migration;
mod store_lifecycle;
