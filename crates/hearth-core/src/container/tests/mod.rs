// Container test module
#[cfg(test)]
mod concurrency_tests;
