//! CrudService: alias resolution, access checks and store operations per action.

mod crud;
mod populate;
mod request;
mod validation;

pub use crud::CrudService;
pub use populate::populate;
pub use request::RequestOptions;
pub use validation::RequestValidator;
