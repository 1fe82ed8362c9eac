pub mod graphql;
pub mod pages;
pub mod rest;
