//! Integration tests for the grant sweep engine

mod checkpoint_corruption;
mod cli_snapshot;
mod end_to_end;
mod failure_isolation;
mod resume;
mod test_utils;
