//! CrudService: generic CRUD over any EntityStore.

mod crud;
mod validation;
pub use crud::{to_api, CrudService, Exposed, Listing, PageInfo, UpdateOutcome, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use validation::RequestValidator;
