//! Catalog and contact-form contracts of the studio website.

pub mod catalog;
pub mod contact;

pub use catalog::{load_catalog, CatalogError, CatalogFilter, ServiceRecord};
pub use contact::{
    mailto_link, ContactError, ContactResponse, ContactSubmission, FieldError, CONTACT_ENDPOINT,
};
