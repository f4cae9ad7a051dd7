pub mod auth;
pub mod categories;
pub mod movies;
pub mod users;

pub use auth::{AuthError, AuthService};
pub use categories::CategoryService;
pub use movies::MovieService;
pub use users::UserService;
