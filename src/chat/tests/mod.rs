//! Unit tests for the chat module.
//!
//! Tests are organised by concept. Collaborators are replaced with
//! `mockall` mocks, a recording delay and a stepping clock so that every
//! case runs without network, database or wall-clock waits.

mod support;
