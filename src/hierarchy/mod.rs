//! Static document hierarchy.
//!
//! Every planning document a project can hold is identified by a
//! [`DocumentKind`]. The registry maps each kind to a [`HierarchyNode`]
//! describing its title, owning role, phase [`Category`], prompt hints and
//! the kinds it unlocks. The table is fixed at compile time.
//!
//! A parallel table behind [`profile_for`] decides how a kind is generated
//! (plain, search-grounded or deep reasoning).

mod profile;
mod registry;

pub use profile::{profile_for, GenerationProfile};
pub use registry::{
    all_kinds, leading_kinds, lookup, nodes_in, prerequisites_of, unlocks_of, Category,
    DocumentKind, HierarchyNode,
};
