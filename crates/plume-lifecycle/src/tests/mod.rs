//! Behavioural tests for lifecycle sequencing.

mod support;
