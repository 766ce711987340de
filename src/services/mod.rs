pub mod cache;
pub mod image_service;
pub mod naming;
pub mod pipeline;
pub mod planner;
pub mod sink;
pub mod storage;
pub mod transformer;
