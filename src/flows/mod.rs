//! Flow document composition and validation.
//!
//! A flow is a JSON document describing a generation job as a metadata
//! block plus a list of processing nodes. Documents are written once per
//! composition and never mutated afterward.

mod composer;
mod validate;

pub use composer::{
    FlowDocument, FlowError, FlowMeta, FlowNode, FlowParams, FlowRequest, compose_flow, load_flow,
};
pub use validate::{assert_required_nodes, load_and_validate};
