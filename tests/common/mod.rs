//! Common test utilities for dynamo-batch
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::common::fixtures::{product_batch, service};
//!
//! #[tokio::test(start_paused = true)]
//! async fn my_test() {
//!     let store = InMemoryStore::open().into_shared();
//!     let service = service(store.clone(), 5);
//!     // ...
//! }
//! ```

pub mod fixtures;

pub use fixtures::{key, keys_of, product_batch, refs, remaining_keys, service};

/// Assert that a result is Ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a result is Err
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
