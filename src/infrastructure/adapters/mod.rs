//! Request surfaces

pub mod console;
