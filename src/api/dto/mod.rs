//! Data Transfer Objects for REST responses.

pub mod status_dto;

pub use status_dto::*;
