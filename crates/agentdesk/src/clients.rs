pub mod openai;
pub mod platform;
pub mod sdk;
pub mod utils;

#[cfg(test)]
pub mod mock;
