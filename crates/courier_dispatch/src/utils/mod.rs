pub(crate) mod completion_latch;
pub(crate) mod fork_join;
pub(crate) mod newtype_id;
pub(crate) mod time;
