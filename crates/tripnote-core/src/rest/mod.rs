mod client;

pub use client::{DataError, DataResult, Direction, Query, RestClient};

#[cfg(test)]
pub(crate) use client::tests;
