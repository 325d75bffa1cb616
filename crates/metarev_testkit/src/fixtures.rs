//! Test fixtures and engine helpers.

use crate::faults::{FaultSwitch, FlakyBackend};
use metarev_core::{Config, MetadataKeySet, Versioning, VersionedKey};
use metarev_storage::InMemoryBackend;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Key set used across the test suites.
///
/// `post` versions `caption`, `gallery` and `tags`; `page` versions
/// `summary`. The default type is `post`.
pub fn sample_config() -> Config {
    Config::new()
        .key_set(
            MetadataKeySet::new()
                .version_key("post", VersionedKey::new("caption").with_label("Caption"))
                .version("post", ["gallery", "tags"])
                .version("page", ["summary"]),
        )
        .default_entity_type("post")
}

enum Medium {
    Memory(InMemoryBackend),
    File { _dir: TempDir, path: PathBuf },
}

/// A test engine that can be closed and reopened over the same journal.
pub struct TestVersioning {
    /// The engine.
    pub versioning: Versioning,
    config: Config,
    medium: Medium,
}

impl TestVersioning {
    /// Opens an engine over an in-memory journal.
    pub fn memory(config: Config) -> Self {
        let backend = InMemoryBackend::new();
        let versioning = Versioning::open_with_backend(config.clone(), Box::new(backend.clone()))
            .expect("Failed to open in-memory engine");
        Self {
            versioning,
            config,
            medium: Medium::Memory(backend),
        }
    }

    /// Opens an engine whose journal appends can be made to fail.
    pub fn memory_with_faults(config: Config) -> (Self, FaultSwitch) {
        let backend = InMemoryBackend::new();
        let flaky = FlakyBackend::new(Box::new(backend.clone()));
        let switch = flaky.switch();
        let versioning = Versioning::open_with_backend(config.clone(), Box::new(flaky))
            .expect("Failed to open flaky engine");
        (
            Self {
                versioning,
                config,
                medium: Medium::Memory(backend),
            },
            switch,
        )
    }

    /// Opens an engine over a journal file in a temporary directory.
    pub fn file(config: Config) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("meta.journal");
        let versioning = Versioning::open(&path, config.clone()).expect("Failed to open file engine");
        Self {
            versioning,
            config,
            medium: Medium::File { _dir: dir, path },
        }
    }

    /// Closes the engine and opens a new one over the same journal.
    pub fn reopen(self) -> Self {
        let Self {
            versioning,
            config,
            medium,
        } = self;
        drop(versioning);
        let versioning = match &medium {
            Medium::Memory(backend) => {
                Versioning::open_with_backend(config.clone(), Box::new(backend.clone()))
            }
            Medium::File { path, .. } => Versioning::open(path, config.clone()),
        }
        .expect("Failed to reopen engine");
        Self {
            versioning,
            config,
            medium,
        }
    }

    /// Journal file path, if file-based.
    pub fn path(&self) -> Option<&Path> {
        match &self.medium {
            Medium::File { path, .. } => Some(path),
            Medium::Memory(_) => None,
        }
    }

    /// Raw journal bytes, if in memory.
    pub fn journal_bytes(&self) -> Option<Vec<u8>> {
        match &self.medium {
            Medium::Memory(backend) => Some(backend.data()),
            Medium::File { .. } => None,
        }
    }
}

impl std::ops::Deref for TestVersioning {
    type Target = Versioning;

    fn deref(&self) -> &Self::Target {
        &self.versioning
    }
}

/// Runs `f` against a fresh in-memory engine using [`sample_config`].
pub fn with_versioning<F, R>(f: F) -> R
where
    F: FnOnce(&Versioning) -> R,
{
    let t = TestVersioning::memory(sample_config());
    f(&t.versioning)
}
