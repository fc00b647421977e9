//! Lazy sound asset resolution
//!
//! Element sound sets only name their assets. The first time a path is about
//! to play, the [`SoundLibrary`] asks its [`SoundResolver`] for a playable
//! [`SoundRef`] and caches the answer, failures included.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Errors a resolver can report for a single asset
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("sound asset not found: {0:?}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A resolved, playable sound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundRef {
    pub id: u64,
    pub path: PathBuf,
}

/// Turns an asset path into something the backend can play
pub trait SoundResolver: Send {
    fn resolve(&mut self, path: &Path, id: u64) -> Result<SoundRef, ResolveError>;
}

/// Accepts every path without touching the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredResolver;

impl SoundResolver for DeferredResolver {
    fn resolve(&mut self, path: &Path, id: u64) -> Result<SoundRef, ResolveError> {
        Ok(SoundRef {
            id,
            path: path.to_path_buf(),
        })
    }
}

/// Only resolves paths that exist on disk
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResolver;

impl SoundResolver for FsResolver {
    fn resolve(&mut self, path: &Path, id: u64) -> Result<SoundRef, ResolveError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResolveError::NotFound(path.to_path_buf()),
            _ => ResolveError::Io(e),
        })?;
        if !metadata.is_file() {
            return Err(ResolveError::NotFound(path.to_path_buf()));
        }
        Ok(SoundRef {
            id,
            path: path.to_path_buf(),
        })
    }
}

/// Cache of resolved sounds keyed by their sound-set path
pub struct SoundLibrary {
    /// Relative paths are resolved against this directory
    pub base_path: PathBuf,
    resolver: Box<dyn SoundResolver>,
    resolved: HashMap<String, SoundRef>,
    failed: HashSet<String>,
    next_id: u64,
}

impl SoundLibrary {
    pub fn new(base_path: impl AsRef<Path>, resolver: impl SoundResolver + 'static) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            resolver: Box::new(resolver),
            resolved: HashMap::new(),
            failed: HashSet::new(),
            next_id: 0,
        }
    }

    /// Full path for a sound-set entry
    pub fn asset_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    /// Resolve `path` on first use; later calls hit the cache.
    ///
    /// A path that failed once is not retried.
    pub fn get_or_resolve(&mut self, path: &str) -> Option<SoundRef> {
        if let Some(sound) = self.resolved.get(path) {
            return Some(sound.clone());
        }
        if self.failed.contains(path) {
            return None;
        }

        let full_path = self.asset_path(path);
        match self.resolver.resolve(&full_path, self.next_id) {
            Ok(sound) => {
                debug!(path, id = sound.id, "Resolved sound asset");
                self.next_id += 1;
                self.resolved.insert(path.to_string(), sound.clone());
                Some(sound)
            }
            Err(e) => {
                warn!(path, error = %e, "Failed to resolve sound asset");
                self.failed.insert(path.to_string());
                None
            }
        }
    }

    /// Number of successfully resolved sounds
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Forget every cached result, including failures
    pub fn clear(&mut self) {
        let count = self.resolved.len();
        self.resolved.clear();
        self.failed.clear();
        debug!(count, "Cleared sound library");
    }
}

impl Default for SoundLibrary {
    fn default() -> Self {
        Self::new("", DeferredResolver)
    }
}

impl std::fmt::Debug for SoundLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundLibrary")
            .field("base_path", &self.base_path)
            .field("resolved", &self.resolved.len())
            .field("failed", &self.failed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_deferred_resolution_is_cached() {
        let mut library = SoundLibrary::new("assets/audio", DeferredResolver);
        let first = library.get_or_resolve("owl.ogg").unwrap();
        let second = library.get_or_resolve("owl.ogg").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.path, PathBuf::from("assets/audio/owl.ogg"));
        assert_eq!(library.resolved_count(), 1);

        let other = library.get_or_resolve("wind.ogg").unwrap();
        assert_ne!(other.id, first.id);
    }

    #[test]
    fn test_fs_resolver_checks_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("creak.wav"), b"RIFF").unwrap();

        let mut library = SoundLibrary::new(dir.path(), FsResolver);
        assert!(library.get_or_resolve("creak.wav").is_some());
        assert!(library.get_or_resolve("missing.wav").is_none());
        // Failures are remembered even if the file shows up later
        fs::write(dir.path().join("missing.wav"), b"RIFF").unwrap();
        assert!(library.get_or_resolve("missing.wav").is_none());

        library.clear();
        assert!(library.get_or_resolve("missing.wav").is_some());
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let library = SoundLibrary::new("assets", DeferredResolver);
        let absolute = std::env::temp_dir().join("thunder.ogg");
        let absolute_str = absolute.to_str().unwrap();
        assert_eq!(library.asset_path(absolute_str), absolute);
    }
}
