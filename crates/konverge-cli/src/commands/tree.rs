//! Handler for `konverge tree`.

use std::path::PathBuf;

use miette::Result;

use konverge_ops::ops_tree::{self, TreeOptions};

pub fn exec(manifest_path: Option<PathBuf>, why: Option<String>, dependencies: bool) -> Result<()> {
    let cwd = std::env::current_dir().map_err(konverge_util::errors::KonvergeError::Io)?;
    let opts = TreeOptions {
        manifest_path,
        why,
        dependencies,
    };
    print!("{}", ops_tree::tree(&cwd, &opts)?);
    Ok(())
}
