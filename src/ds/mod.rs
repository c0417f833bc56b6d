//! Data Structures Module
//!
//! Arena-backed building blocks shared by the expiration and eviction
//! policies.

mod indexed_heap;
mod intrusive_list;
mod slot_arena;

pub use indexed_heap::{IndexedHeap, NodeId};
pub use intrusive_list::IntrusiveList;
pub use slot_arena::{SlotArena, SlotId};
