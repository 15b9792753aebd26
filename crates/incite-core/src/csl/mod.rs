//! CSL JSON item handling
//!
//! The Citation Style Language JSON item shape is the canonical
//! representation of bibliographic metadata at every boundary: provider
//! responses are normalized into it, manual reference files contain it, the
//! cache stores it, and the resolved collection is a sequence of it.

pub mod item;
pub mod note;
pub mod validate;

pub use item::CslItem;
pub use note::{append_note_dict, append_note_text, parse_note};
pub use validate::{validate_and_prune, SchemaError};
