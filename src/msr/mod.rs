//! MSR (Music Score Representation) skeleton
//!
//! The container hierarchy of a score, built before any musical content is
//! attached:
//!
//! ```text
//! MsrScore
//! ├── identification, credits
//! ├── part_groups (arena, PartGroupId)
//! │   └── elements: part-groups and parts, in document order
//! └── parts (arena, PartId)
//!     └── staves
//!         └── voices
//! ```
//!
//! Containment is expressed with stable arena ids rather than shared pointers:
//! a part-group lists its elements by id and knows its upper part-group by id.

pub mod identification;
pub mod part_groups;
pub mod parts;
pub mod score;

pub use identification::{MsrCredit, MsrIdentification};
pub use part_groups::{
    MsrPartGroup, PartGroupBarline, PartGroupElement, PartGroupId, PartGroupSymbol,
};
pub use parts::{MsrPart, MsrStaff, MsrVoice, PartId, VoiceKind};
pub use score::MsrScore;
