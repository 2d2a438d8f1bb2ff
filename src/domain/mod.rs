pub mod agenda;
pub mod free_time;
pub mod interval;
pub mod models;
pub mod report;
