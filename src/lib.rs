pub mod api;
pub mod capture;
pub mod cli;
pub mod config;
pub mod curate;
pub mod detector;
pub mod error;
pub mod recommender;
pub mod session;
pub mod submitter;
pub mod token;
pub mod workflow;
