// assets.rs - Named optional audio asset references

//! Byte buffers for the named cues. Assets are optional by contract:
//! absence or a failed read degrades playback to the synthesis tier and
//! never blocks the sequence.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::audio::AssetKind;

/// Extensions probed per asset, in preference order.
const PROBE_EXTENSIONS: [&str; 2] = ["ogg", "wav"];

/// The set of loaded asset byte buffers handed to the audio chain.
///
/// Buffers are reference counted so the chain can keep the raw bytes for
/// the streaming tier while the decoded samples live alongside.
#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    buffers: HashMap<AssetKind, Arc<[u8]>>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe `dir` for `startup`/`run`/`shutdown`/`work` files. Missing or
    /// unreadable files are logged and skipped.
    pub fn load_dir(dir: &Path) -> Self {
        let mut set = AssetSet::new();
        for kind in AssetKind::ALL {
            for ext in PROBE_EXTENSIONS {
                let path = dir.join(format!("{}.{}", kind.name(), ext));
                if !path.exists() {
                    continue;
                }
                match std::fs::read(&path) {
                    Ok(bytes) => {
                        log::debug!("loaded asset {:?} from {}", kind, path.display());
                        set.insert_bytes(kind, bytes);
                        break;
                    }
                    Err(err) => {
                        log::warn!("failed to read asset {}: {}", path.display(), err);
                    }
                }
            }
        }
        set
    }

    pub fn insert_bytes(&mut self, kind: AssetKind, bytes: Vec<u8>) {
        self.buffers.insert(kind, Arc::from(bytes.into_boxed_slice()));
    }

    pub fn get(&self, kind: AssetKind) -> Option<Arc<[u8]>> {
        self.buffers.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetKind, Arc<[u8]>)> + '_ {
        self.buffers.iter().map(|(k, v)| (*k, Arc::clone(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_set() {
        let set = AssetSet::new();
        assert!(set.is_empty());
        assert!(set.get(AssetKind::Startup).is_none());
    }

    #[test]
    fn test_insert_and_get() {
        let mut set = AssetSet::new();
        set.insert_bytes(AssetKind::Work, vec![1, 2, 3]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(AssetKind::Work).unwrap().as_ref(), &[1, 2, 3]);
        assert!(set.get(AssetKind::Run).is_none());
    }

    #[test]
    fn test_load_dir_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let set = AssetSet::load_dir(dir.path());
        assert!(set.is_empty());
    }

    #[test]
    fn test_load_dir_partial() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("work.wav")).unwrap();
        f.write_all(b"RIFFxxxx").unwrap();

        let set = AssetSet::load_dir(dir.path());
        assert_eq!(set.len(), 1);
        assert!(set.get(AssetKind::Work).is_some());
        assert!(set.get(AssetKind::Startup).is_none());
    }

    #[test]
    fn test_load_dir_prefers_ogg() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.ogg"), b"ogg-bytes").unwrap();
        std::fs::write(dir.path().join("run.wav"), b"wav-bytes").unwrap();

        let set = AssetSet::load_dir(dir.path());
        assert_eq!(set.get(AssetKind::Run).unwrap().as_ref(), b"ogg-bytes");
    }

    #[test]
    fn test_nonexistent_dir() {
        let set = AssetSet::load_dir(Path::new("/nonexistent/assets"));
        assert!(set.is_empty());
    }
}
