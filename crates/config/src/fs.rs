use std::collections::HashMap;
use std::path::Path;

/// Where config file bytes come from. Grounded on the `Store` blanket-impl
/// pattern (pluggable backing storage behind a small trait) used for
/// address/state storage elsewhere in this workspace.
pub trait FileLoader {
    fn load(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads from the real filesystem.
pub struct RealFs;

impl FileLoader for RealFs {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// An in-memory fixture loader, for tests that exercise `$INCLUDE` without
/// touching disk.
#[derive(Default)]
pub struct MapFs(pub HashMap<String, String>);

impl FileLoader for MapFs {
    fn load(&self, path: &Path) -> std::io::Result<String> {
        self.0
            .get(&path.to_string_lossy().to_string())
            .cloned()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "not in fixture map")
            })
    }
}
