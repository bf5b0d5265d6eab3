use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use crate::WatchError;

/// Directories currently registered with the watch backend.
///
/// Grows as directories appear and shrinks through [`WatchState::forget`]
/// when one is removed, so a directory re-created at the same path is walked
/// and registered again.
#[derive(Debug)]
pub struct WatchState {
    root: PathBuf,
    dirs: BTreeSet<PathBuf>,
}

impl WatchState {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dirs: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, dir: &Path) -> bool {
        self.dirs.contains(dir)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Register `dir` and every directory below it through `add`.
    ///
    /// Symlinks are not followed and already registered directories are
    /// skipped (along with their subtree). A failing directory is reported
    /// and left out; the walk continues with its children.
    pub fn register_tree<F>(&mut self, dir: &Path, mut add: F) -> Vec<WatchError>
    where
        F: FnMut(&Path) -> notify::Result<()>,
    {
        let mut errors = Vec::new();
        let mut stack = vec![dir.to_path_buf()];

        while let Some(dir) = stack.pop() {
            if self.dirs.contains(&dir) {
                continue;
            }
            match add(&dir) {
                Ok(()) => {
                    self.dirs.insert(dir.clone());
                }
                Err(e) => errors.push(WatchError::register(&dir, e)),
            }

            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    // Already reported by `add` when the directory itself is gone.
                    if self.dirs.contains(&dir) {
                        errors.push(WatchError::register(&dir, notify::Error::io(e)));
                    }
                    continue;
                }
            };
            for entry in entries.flatten() {
                if entry.file_type().is_ok_and(|t| t.is_dir()) {
                    stack.push(entry.path());
                }
            }
        }
        errors
    }

    /// Drop `path` and everything registered below it.
    ///
    /// The backend releases watches on deleted directories by itself; this
    /// keeps the bookkeeping in line so a re-created directory is registered
    /// again.
    pub fn forget(&mut self, path: &Path) -> usize {
        let before = self.dirs.len();
        self.dirs.retain(|d| !d.starts_with(path));
        before - self.dirs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("content/posts")).unwrap();
        fs::create_dir_all(tmp.path().join("static")).unwrap();
        fs::write(tmp.path().join("hugo.toml"), "title = 'x'").unwrap();
        fs::write(tmp.path().join("content/posts/a.md"), "# a").unwrap();
        tmp
    }

    #[test]
    fn registers_every_directory_once() {
        let tmp = tree();
        let mut state = WatchState::new(tmp.path());
        let mut seen = Vec::new();

        let errors = state.register_tree(tmp.path(), |p| {
            seen.push(p.to_path_buf());
            Ok(())
        });

        assert!(errors.is_empty());
        seen.sort();
        let mut want = vec![
            tmp.path().to_path_buf(),
            tmp.path().join("content"),
            tmp.path().join("content/posts"),
            tmp.path().join("static"),
        ];
        want.sort();
        assert_eq!(seen, want);

        let again = state.register_tree(tmp.path(), |_| panic!("already registered"));
        assert!(again.is_empty());
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn failing_directory_is_reported_and_skipped() {
        let tmp = tree();
        let bad = tmp.path().join("content");
        let mut state = WatchState::new(tmp.path());

        let errors = state.register_tree(tmp.path(), |p| {
            if p == bad {
                Err(notify::Error::generic("limit reached"))
            } else {
                Ok(())
            }
        });

        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], WatchError::Register { path, .. } if *path == bad));
        assert!(!state.contains(&bad));
        assert!(state.contains(&tmp.path().join("content/posts")));
    }

    #[test]
    fn forget_drops_subtree() {
        let tmp = tree();
        let mut state = WatchState::new(tmp.path());
        state.register_tree(tmp.path(), |_| Ok(()));

        assert_eq!(state.forget(&tmp.path().join("content")), 2);
        assert!(state.contains(tmp.path()));
        assert!(!state.contains(&tmp.path().join("content/posts")));

        let mut added = 0;
        state.register_tree(&tmp.path().join("content"), |_| {
            added += 1;
            Ok(())
        });
        assert_eq!(added, 2);
        assert_eq!(state.len(), 4);
    }

    #[test]
    fn missing_root_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let gone = tmp.path().join("nope");
        let mut state = WatchState::new(&gone);

        let errors = state.register_tree(&gone, |p| {
            Err(notify::Error::path_not_found().add_path(p.to_path_buf()))
        });

        assert_eq!(errors.len(), 1);
        assert!(state.is_empty());
    }
}
