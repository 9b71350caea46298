#![forbid(unsafe_code)]

pub mod client;
pub mod config;
pub mod datamodel;
pub mod exporters;
pub mod http;
pub mod patch;
pub mod registration;
pub mod scheduler;
pub mod status;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
