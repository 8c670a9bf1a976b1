pub mod provider;
pub mod types;
pub mod yahoo;

#[cfg(test)]
pub(crate) mod fake;
