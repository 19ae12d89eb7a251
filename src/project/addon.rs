//! Addon repair: an `addons/<name>/` directory with orphaned tool scripts
//! but no `plugin.cfg` gets a minimal one synthesized, pointed at whichever
//! script extends the editor-plugin base class (spec §4.G "Addon repair").

use thiserror::Error;

const EDITOR_PLUGIN_BASE_CLASS: &str = "EditorPlugin";

#[derive(Debug, Error)]
pub enum AddonError {
    #[error("no script in the addon extends {EDITOR_PLUGIN_BASE_CLASS}")]
    NoMainScriptFound,
    #[error("more than one candidate main script found: {0:?}")]
    AmbiguousMainScript(Vec<String>),
}

/// One script found under an `addons/<name>/` directory, with the base
/// class its `extends` clause names (already resolved by the caller from
/// the decompiled source, not re-parsed here).
pub struct ScriptCandidate<'a> {
    pub path: &'a str,
    pub extends: &'a str,
}

/// Synthesizes a minimal `plugin.cfg` for `addon_name`, or reports why none
/// could be written.
pub fn repair_addon(addon_name: &str, scripts: &[ScriptCandidate]) -> Result<String, AddonError> {
    let candidates: Vec<&str> = scripts
        .iter()
        .filter(|s| s.extends == EDITOR_PLUGIN_BASE_CLASS)
        .map(|s| s.path)
        .collect();

    match candidates.as_slice() {
        [] => Err(AddonError::NoMainScriptFound),
        [single] => Ok(format!(
            "[plugin]\n\nname=\"{addon_name}\"\ndescription=\"\"\nauthor=\"\"\nversion=\"1.0\"\nscript=\"{single}\"\n"
        )),
        many => Err(AddonError::AmbiguousMainScript(many.iter().map(|s| s.to_string()).collect())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_a_plugin_cfg_for_the_single_plugin_script() {
        let scripts = vec![
            ScriptCandidate { path: "res://addons/foo/util.gd", extends: "RefCounted" },
            ScriptCandidate { path: "res://addons/foo/plugin.gd", extends: "EditorPlugin" },
        ];
        let cfg = repair_addon("foo", &scripts).unwrap();
        assert!(cfg.contains("script=\"res://addons/foo/plugin.gd\""));
        assert!(cfg.contains("name=\"foo\""));
    }

    #[test]
    fn no_plugin_script_is_an_error() {
        let scripts = vec![ScriptCandidate { path: "res://addons/foo/util.gd", extends: "RefCounted" }];
        assert!(matches!(repair_addon("foo", &scripts), Err(AddonError::NoMainScriptFound)));
    }

    #[test]
    fn two_plugin_scripts_is_ambiguous() {
        let scripts = vec![
            ScriptCandidate { path: "res://addons/foo/a.gd", extends: "EditorPlugin" },
            ScriptCandidate { path: "res://addons/foo/b.gd", extends: "EditorPlugin" },
        ];
        assert!(matches!(repair_addon("foo", &scripts), Err(AddonError::AmbiguousMainScript(_))));
    }
}
