//! quizclock-report — Renders analysis reports for people.

pub mod html;
