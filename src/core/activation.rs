//! conda activation hooks that put the prefix's libraries on the search path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::context::HostOs;

pub const HOOK_NAME: &str = "pyoptsparse_lib.sh";

/// `(activate, deactivate)` script locations below a conda prefix.
pub fn hook_paths(prefix: &Path) -> (PathBuf, PathBuf) {
    let base = prefix.join("etc").join("conda");
    (
        base.join("activate.d").join(HOOK_NAME),
        base.join("deactivate.d").join(HOOK_NAME),
    )
}

fn activate_script(var: &str, lib_dir: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         if [ -n \"${{{var}}}\" ]; then\n\
         \x20   export OLD_{var}=\"${{{var}}}\"\n\
         \x20   export {var}=\"{lib}:${{{var}}}\"\n\
         else\n\
         \x20   export {var}=\"{lib}\"\n\
         fi\n",
        var = var,
        lib = lib_dir.display()
    )
}

fn deactivate_script(var: &str) -> String {
    format!(
        "#!/bin/sh\n\
         if [ -n \"${{OLD_{var}}}\" ]; then\n\
         \x20   export {var}=\"${{OLD_{var}}}\"\n\
         \x20   unset OLD_{var}\n\
         else\n\
         \x20   unset {var}\n\
         fi\n",
        var = var
    )
}

/// Write both hooks. Returns the files written.
pub fn write_hooks(prefix: &Path, host: HostOs) -> io::Result<Vec<PathBuf>> {
    let var = host.library_path_var();
    let (activate, deactivate) = hook_paths(prefix);
    let scripts = [
        (activate, activate_script(var, &prefix.join("lib"))),
        (deactivate, deactivate_script(var)),
    ];

    let mut written = Vec::new();
    for (path, body) in scripts {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        written.push(path);
    }
    Ok(written)
}
