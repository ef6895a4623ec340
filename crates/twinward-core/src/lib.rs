pub mod enforcer;
pub mod resolve;
pub mod tree;
pub mod view;

pub use enforcer::Enforcer;
pub use resolve::EffectedSubjectIds;
pub use tree::{CompileError, PolicyTree, ResourceNode, SubjectPermissions, Validity};
