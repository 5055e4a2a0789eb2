pub mod change;
pub mod unit;

pub use change::{Change, ChangeSet, ChangeState};
pub use unit::{CommitStrategy, UnitOfWork, ViewBinding};
