mod arena;
mod balance;
mod handle;
mod node;
mod raw_rbtree_map;
mod rotate;

pub(crate) use handle::Handle;
pub(crate) use raw_rbtree_map::RawRBTreeMap;
