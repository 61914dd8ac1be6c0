pub mod features;
pub mod tools;

#[cfg(test)]
pub mod testing;
