//! Structural checks over composed flow documents.

use std::collections::BTreeSet;

use super::composer::{FlowDocument, FlowError, load_flow};
use crate::config::DriveConfig;

/// Asserts that every required node type is present in the document.
///
/// # Errors
///
/// Returns [`FlowError::MissingNodes`] listing the absent types.
pub fn assert_required_nodes(flow: &FlowDocument, required: &[&str]) -> Result<(), FlowError> {
    let present: BTreeSet<&str> = flow.nodes.iter().map(|node| node.node_type.as_str()).collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|required_type| !present.contains(**required_type))
        .map(|required_type| (*required_type).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FlowError::MissingNodes { missing })
    }
}

/// Loads a flow by identifier and checks it carries the required node types.
///
/// # Errors
///
/// Returns any [`FlowError`] from loading, or
/// [`FlowError::MissingNodes`] when a required type is absent.
pub async fn load_and_validate(
    identifier: &str,
    required: &[&str],
    config: &DriveConfig,
) -> Result<FlowDocument, FlowError> {
    let flow = load_flow(identifier, config).await?;
    assert_required_nodes(&flow, required)?;
    Ok(flow)
}
