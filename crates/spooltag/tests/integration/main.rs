//! Integration test entry point for spooltag.
//!
//! Run with: cargo test -p spooltag --test integration

mod harness;
mod hotplug;
mod read_write;
