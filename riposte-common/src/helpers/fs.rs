use std::os::unix::prelude::PermissionsExt;
use std::path::Path;

pub fn secure_file(path: &Path) -> std::io::Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}
