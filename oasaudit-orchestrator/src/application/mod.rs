pub mod dispatcher;
pub mod gate;
pub mod pipeline;
pub mod reporting;
