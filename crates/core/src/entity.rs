//! Identity of stored records.

/// A record addressed by a typed id. Storage backends key their tables by it.
pub trait Entity {
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
