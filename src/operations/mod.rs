pub mod boolean;
pub mod cleanup;
pub mod creation;
pub mod fillet;
pub mod query;
pub mod repair;
