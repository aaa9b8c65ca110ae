#![deny(warnings)]
pub mod belief;
pub mod model;
pub mod rules;
