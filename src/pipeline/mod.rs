pub mod job_runner;
pub mod page_processor;
pub mod page_source;
pub mod preview;
