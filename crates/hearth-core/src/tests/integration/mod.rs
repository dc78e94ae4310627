#![cfg(test)]

pub mod application_tests;
pub mod common;
pub mod lifecycle_tests;
