// HTTP request handlers

pub mod projects;
