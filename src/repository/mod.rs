pub mod bid_repository;
pub mod job_repository;
