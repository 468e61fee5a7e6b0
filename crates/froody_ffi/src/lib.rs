//! Flutter bridge crate for the Froody map core.

pub mod api;
