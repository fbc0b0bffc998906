//! Asynchronous job correlation
//!
//! Submit hands back a provider job id; the provider later calls back with the
//! outcome, which is stored under that id and served to pollers. Submit,
//! callback and poll may run in different invocations and only share the
//! [`JobStore`].

pub mod callback;
pub mod fields;
pub mod poller;
pub mod store;

pub use callback::CallbackReceiver;
pub use poller::StatusPoller;
pub use store::{JobStore, MemoryJobStore};
