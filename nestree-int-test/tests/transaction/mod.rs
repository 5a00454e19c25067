mod conflict_test;
mod rollback_test;
