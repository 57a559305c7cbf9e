pub mod backend;
pub mod code_scanning;
pub mod quota;
pub mod resilience;
