//! Change transport adapters.

mod memory;
mod postgres;

pub use memory::InMemoryChangeTransport;
pub use postgres::PgChangeTransport;
