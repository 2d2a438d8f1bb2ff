pub mod bootstrap;
pub mod calendar_service;
pub mod commands;
pub mod oauth;
