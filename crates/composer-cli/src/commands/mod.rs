//! Command handlers grouped by API area.

pub(crate) mod compose;
pub(crate) mod projects;
