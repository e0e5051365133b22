//! Mock TCP fixtures for integration tests: a [`MockWorker`] that dials into
//! a dispatcher under test and performs the worker-ingress handshake, a
//! [`MockDispatcher`] that plays the dispatcher's side of that same
//! handshake for a worker under test, and a [`MockUpstream`] that stands in
//! for the upstream game server a worker under test connects to.

pub mod mock_dispatcher;
pub mod mock_upstream;
pub mod mock_worker;

pub use mock_dispatcher::MockDispatcher;
pub use mock_upstream::MockUpstream;
pub use mock_worker::MockWorker;
