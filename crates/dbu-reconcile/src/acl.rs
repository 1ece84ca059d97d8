//! ACL translation between the declared block and the provider's flat shapes.
//!
//! Outgoing requests always carry all four lists. An ACL update replaces the
//! whole ACL; a set missing from the declaration is sent as `[]` so the
//! provider clears it.

use std::collections::BTreeSet;

use dbu_schemas::{AccessControlList, UserAclRequest};

use crate::AccessControl;

/// Build the full-replace ACL request for a declared block.
///
/// `permission` is left unset; permission changes travel in their own call.
pub fn to_request(acl: &AccessControl) -> UserAclRequest {
    UserAclRequest {
        permission: None,
        acl_categories: Some(as_list(&acl.acl_categories)),
        acl_channels: Some(as_list(&acl.acl_channels)),
        acl_commands: Some(as_list(&acl.acl_commands)),
        acl_keys: Some(as_list(&acl.acl_keys)),
    }
}

/// Copy an observed ACL into the declared shape. Every set comes back declared.
pub fn from_response(observed: &AccessControlList) -> AccessControl {
    AccessControl {
        acl_categories: Some(as_set(&observed.acl_categories)),
        acl_channels: Some(as_set(&observed.acl_channels)),
        acl_commands: Some(as_set(&observed.acl_commands)),
        acl_keys: Some(as_set(&observed.acl_keys)),
    }
}

/// Pick the access-control block to honor from a declaration.
///
/// The front end declares the block as a collection limited to one element.
/// If more than one arrives, only the first is used and the rest are ignored.
pub fn first_block(blocks: &[AccessControl]) -> Option<&AccessControl> {
    blocks.first()
}

fn as_list(set: &Option<BTreeSet<String>>) -> Vec<String> {
    set.iter().flatten().cloned().collect()
}

fn as_set(list: &[String]) -> BTreeSet<String> {
    list.iter().cloned().collect()
}
