pub mod fixtures;

#[cfg(test)]
mod message_tests;
#[cfg(test)]
mod file_tests;
