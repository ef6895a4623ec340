pub mod error;
pub mod path;
pub mod permission;
pub mod policy;
pub mod subject;
pub mod validation;

pub use error::ParseError;
pub use path::{PointerLocation, ResourceKey, ResourcePath, ResourceType};
pub use permission::{ADMINISTRATE, EffectedPermissions, Permission, READ, WRITE};
pub use policy::{Policy, PolicyEntry, PolicyResource};
pub use subject::{Subject, SubjectId};
pub use validation::{PolicyLimits, ValidationError, validate_policy, validate_structure};
