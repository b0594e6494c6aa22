//! Ordered-container building blocks (C6) shared by the heap (C4) and the
//! dispatch fabric (C5).

pub mod avl;
pub mod fxhash;
pub mod list;

pub use avl::AvlTree;
pub use fxhash::FxHashMap;
pub use list::SlQueue;
