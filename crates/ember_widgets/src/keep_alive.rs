//! Keep-alive capability
//!
//! Virtualized lists ask off-screen items whether their state must be kept.
//! Widget states answer through this trait instead of inheriting the behavior.

pub trait KeepAlive {
    /// True while the item has work in flight that would be lost on disposal
    fn wants_keep_alive(&self) -> bool;
}
