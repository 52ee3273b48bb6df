//! Integration tests

mod common;
mod concurrency_test;
mod config_test;
mod e2e_test;
mod store_test;
