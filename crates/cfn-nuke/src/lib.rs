//! cfn-nuke library
//!
//! Removes CloudFormation stacks that a plain `DeleteStack` cannot: stacks
//! mid-update, stacks stuck in `DELETE_FAILED`, protected stacks, and stacks
//! whose execution role is gone.

pub mod aws;
pub mod config;
pub mod stack;
pub mod wait;
