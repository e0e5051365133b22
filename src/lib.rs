//! Umbrella crate for `rusty-proxy`. Carries no runtime code of its own —
//! the dispatcher and worker daemons live under `services/dispatcher` and
//! `services/worker` respectively, and the codec/wire-format building blocks
//! live under `crates/`. This crate exists so the root-level
//! `tests/integration/*.rs` suites have a package to attach to.
