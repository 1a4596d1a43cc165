use std::io;
use std::path::Path;
use std::time::Duration;

/// Options passed through to a [FileLoader] call.
#[derive(Debug, Clone)]
pub struct LoadArgs {
    /// How long a load may take before the loader gives up. Plain
    /// filesystem reads treat this as advisory; network-backed loaders
    /// should enforce it.
    pub timeout: Duration,
}

impl Default for LoadArgs {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Loads the text of a referenced file, as used by `import` and `extends`.
///
/// `path` is whatever was written in the document; implementations resolve
/// it against `root_dir`. Failures surface as `io::Error` and are reported
/// at the statement that triggered the load.
pub trait FileLoader {
    fn load(&self, root_dir: &Path, path: &str, args: &LoadArgs) -> io::Result<String>;
}

/// The default loader: reads files from disk under `root_dir`.
#[derive(Debug, Default)]
pub struct FsLoader;

impl FileLoader for FsLoader {
    fn load(&self, root_dir: &Path, path: &str, _args: &LoadArgs) -> io::Result<String> {
        fs_err::read_to_string(root_dir.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn fs_loader_resolves_against_root_dir() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut file = fs_err::File::create(dir.path().join("base.bconf"))?;
        writeln!(file, "k = 1")?;

        let loaded = FsLoader.load(dir.path(), "base.bconf", &LoadArgs::default())?;
        assert_eq!(loaded, "k = 1\n");
        Ok(())
    }

    #[test]
    fn fs_loader_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsLoader
            .load(dir.path(), "nope.bconf", &LoadArgs::default())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        // fs-err includes the offending path in the message.
        assert!(err.to_string().contains("nope.bconf"));
    }
}
