//! Core of the content store: schema-free JSON records grouped in named
//! resources, the mutations applied to them, language fallback on read, and
//! the intake form schemas.
//!
//! Nothing in this crate does I/O. Storage backends and the HTTP surface
//! live in `contentstore-cli`.
//!
//! # Examples
//! ```
//! use contentstore_lib::{collection, Localizer, Record};
//! use serde_json::json;
//!
//! let mut products: Vec<Record> = Vec::new();
//! let fields = json!({"id": "p1", "name_en": "Home battery", "name_fr": "Batterie"});
//! collection::create(&mut products, fields.as_object().cloned().unwrap(), 1_700_000_000_000);
//!
//! let localized = Localizer::default().localize_all(&products, "fr");
//! assert_eq!(localized[0]["name"], "Batterie");
//! ```

pub mod collection;
pub mod forms;
pub mod localize;
pub mod record;
pub mod resource;

pub use collection::{MutationError, Outcome};
pub use forms::{FieldError, FormKind, Notification, StoredSubmission};
pub use localize::Localizer;
pub use record::Record;
pub use resource::{ResourceName, ResourceNameError};
