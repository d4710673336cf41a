//! Infrastructure layer: queue and object-store ports with their in-memory
//! adapters, the HTTP fetcher, and the fetch-and-persist worker pool.

pub mod fetch;
pub mod queue;
pub mod store;
pub mod worker;
