pub mod classifier;
pub mod data_dictionary;
pub mod discovery;
pub mod enricher;
pub mod locator;
