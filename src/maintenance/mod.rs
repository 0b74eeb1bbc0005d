//! Maintenance passes
//!
//! Independent of any live session:
//! - OrphanRecoveryManager reconciles on-disk segments with the store after
//!   an unclean shutdown
//! - RetentionManager bounds local storage consumption

pub mod recovery;
pub mod retention;

pub use recovery::OrphanRecoveryManager;
pub use retention::RetentionManager;
