pub(crate) mod graph;
pub(crate) mod mix;
pub(crate) mod param;
