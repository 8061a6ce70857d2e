mod model;
pub mod provision;
mod repo;

pub use model::{NewUser, PublicUser, Role, RoleParseError, User, UserPatch};
pub use provision::{provision_user, ProvisionError, ProvisionUser};
