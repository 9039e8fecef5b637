// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Reflection/script attribute record and its inheritance algebra.
//!
//! Declarations opt in with an annotation string of the form
//! `nickel(tag[, tag...])`. Recognized tags are `refl`, `norefl`, `script` and
//! `noscript`; anything else parses to the all-false record.
//!
//! The effective record of a node is always derived with [`effective`] from
//! its own annotation and its parent's effective record:
//! - a veto (`force_no_*`) anywhere above is irrevocable for the subtree;
//! - a need (`wants_*`) is inherited by every descendant not under a veto.

use serde::{Deserialize, Serialize};

/// Annotation prefix shared by every recognized attribute string.
pub const ANNOTATION_PREFIX: &str = "nickel(";

/// Four independent reflection/scripting flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReflAttributes {
    /// Participates in the runtime reflection registry.
    pub wants_reflection: bool,
    /// Vetoes reflection for this node and its subtree.
    pub force_no_reflection: bool,
    /// Participates in the script binding layer.
    pub wants_script: bool,
    /// Vetoes scripting for this node and its subtree.
    pub force_no_script: bool,
}

impl ReflAttributes {
    /// The all-false record (no need, no veto).
    pub const NONE: Self = Self {
        wants_reflection: false,
        force_no_reflection: false,
        wants_script: false,
        force_no_script: false,
    };

    /// Parse a raw annotation string (e.g. `nickel(refl, script)`).
    ///
    /// Strings that are not `nickel(...)` annotations yield [`Self::NONE`].
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let Some(body) = raw
            .strip_prefix(ANNOTATION_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Self::NONE;
        };

        let mut attrs = Self::NONE;
        for tag in body.split(',').map(str::trim) {
            match tag {
                "refl" => attrs.wants_reflection = true,
                "norefl" => attrs.force_no_reflection = true,
                "script" => attrs.wants_script = true,
                "noscript" => attrs.force_no_script = true,
                _ => {}
            }
        }
        attrs
    }

    /// Whether the node needs reflection, scripting, or both.
    pub fn any_need(&self) -> bool {
        self.wants_reflection || self.wants_script
    }
}

/// Combine a node's local record with its parent's effective record.
pub fn effective(local: ReflAttributes, parent: ReflAttributes) -> ReflAttributes {
    let force_no_reflection = local.force_no_reflection || parent.force_no_reflection;
    let force_no_script = local.force_no_script || parent.force_no_script;
    ReflAttributes {
        wants_reflection: !force_no_reflection
            && (local.wants_reflection || parent.wants_reflection),
        force_no_reflection,
        wants_script: !force_no_script && (local.wants_script || parent.wants_script),
        force_no_script,
    }
}
