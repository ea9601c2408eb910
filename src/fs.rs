use std::{fs, path::Path};

use crate::prelude::*;

/// Replace the file contents so that readers never observe a partial write.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    let mut temporary = path.as_os_str().to_owned();
    temporary.push(".tmp");
    fs::write(&temporary, contents)
        .with_context(|| format!("failed to write `{}`", Path::new(&temporary).display()))?;
    fs::rename(&temporary, path)
        .with_context(|| format!("failed to move the new contents into `{}`", path.display()))
}
