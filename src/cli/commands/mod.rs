pub mod audit;
pub mod discover;
pub mod quota;
