pub mod dashboard;
pub mod rest;
pub mod ws;
