// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Process environment helpers and shell activation scripts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Session;
use crate::spec::is_valid_identifier;

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// Snapshot the invoking process's environment.
///
/// Variables that are not valid unicode are skipped.
pub fn host_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Split a PATH-style value into its non-empty entries.
pub fn split_path(value: &str) -> Vec<PathBuf> {
    std::env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

/// Join directories into a PATH-style value.
pub fn join_path(dirs: &[PathBuf]) -> crate::Result<String> {
    let joined = std::env::join_paths(dirs).map_err(|e| {
        crate::Error::ValidationFailed(format!("cannot build PATH from {dirs:?}: {e}"))
    })?;
    joined.into_string().map_err(|value| {
        crate::Error::ValidationFailed(format!("PATH is not valid unicode: {value:?}"))
    })
}

/// Quote a value for use inside double quotes in a POSIX shell.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Generate a POSIX shell script that turns `previous` into the session's
/// environment and then runs the hook, if any.
///
/// Names a shell cannot assign, eg: `BASH_FUNC_foo%%`, are left alone.
pub fn generate_startup_script(
    session: &Session,
    previous: &BTreeMap<String, String>,
    hook: Option<&str>,
) -> String {
    let variables = session.effective_variables();
    let mut script = String::from("# generated by pinenv\n");

    for name in previous.keys().filter(|name| is_valid_identifier(name)) {
        if !variables.contains_key(name) {
            script.push_str(&format!("unset {name}\n"));
        }
    }

    for (name, value) in variables {
        if !is_valid_identifier(name) || previous.get(name) == Some(value) {
            continue;
        }
        script.push_str(&format!("export {name}=\"{}\"\n", escape_value(value)));
    }

    if let Some(hook) = hook {
        script.push_str("# activation hook\n");
        script.push_str(hook);
        if !hook.ends_with('\n') {
            script.push('\n');
        }
    }

    script
}
