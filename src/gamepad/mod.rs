pub mod backend;
pub mod mapping;
#[cfg(test)]
pub mod mapping_test;
pub mod reader;
#[cfg(test)]
pub mod reader_test;
pub mod state;
