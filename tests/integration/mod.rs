//! Integration tests for the helpdesk API
//!
//! These tests drive the full router (auth middleware included) against a
//! real SQLite database.

mod api_tests;
mod employee_tests;
mod ticket_tests;
