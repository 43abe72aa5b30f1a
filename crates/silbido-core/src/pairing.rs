//! Audio and annotation file pairing
//!
//! Every `*.bin` annotation under the annotation directory names its
//! recording by file stem: `<stem>.bin` pairs with `<stem>.wav` (or
//! `<stem>.flac`) anywhere under the audio directory.

use crate::audio::AudioFormat;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairingError {
    #[error("could not find audio file {name} corresponding to annotation {}", annotation.display())]
    MissingAudio { name: String, annotation: PathBuf },

    #[error("failed to list {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One recording and its annotation file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingPair {
    pub audio: PathBuf,
    pub annotation: PathBuf,
}

impl RecordingPair {
    /// Recording name used for output directories
    pub fn name(&self) -> String {
        self.audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Files under `root` (recursively) accepted by `keep`, sorted by path
pub fn find_files(root: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, PairingError> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let walk_err = |source| PairingError::Walk {
            path: dir.clone(),
            source,
        };
        for entry in fs::read_dir(&dir).map_err(walk_err)? {
            let path = entry.map_err(walk_err)?.path();
            if path.is_dir() {
                pending.push(path);
            } else if keep(&path) {
                found.push(path);
            }
        }
    }

    found.sort();
    Ok(found)
}

pub fn is_annotation(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("bin")
}

/// Pair each annotation under `annotation_dir` with its recording under
/// `audio_dir`, in annotation path order.
pub fn pair_recordings(audio_dir: &Path, annotation_dir: &Path) -> Result<Vec<RecordingPair>, PairingError> {
    let audio_files = find_files(audio_dir, |p| AudioFormat::from_path(p).is_supported())?;
    let annotations = find_files(annotation_dir, is_annotation)?;

    let mut by_name: HashMap<String, PathBuf> = HashMap::new();
    for path in audio_files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if let Some(existing) = by_name.get(&name) {
            log::warn!(
                "Ignoring {}: {} already provides {}",
                path.display(),
                existing.display(),
                name
            );
            continue;
        }
        by_name.insert(name, path);
    }

    let mut pairs = Vec::with_capacity(annotations.len());
    for annotation in annotations {
        let stem = annotation
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let audio = ["wav", "flac"]
            .iter()
            .find_map(|ext| by_name.get(&format!("{}.{}", stem, ext)));

        match audio {
            Some(audio) => pairs.push(RecordingPair {
                audio: audio.clone(),
                annotation,
            }),
            None => {
                return Err(PairingError::MissingAudio {
                    name: format!("{}.wav", stem),
                    annotation,
                })
            }
        }
    }

    log::info!(
        "Paired {} annotation files with recordings under {}",
        pairs.len(),
        audio_dir.display()
    );
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_pairs_by_stem_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio");
        let annotations = dir.path().join("annotations");

        touch(&audio.join("site1/b.wav"));
        touch(&audio.join("a.flac"));
        touch(&audio.join("unused.wav"));
        touch(&audio.join("readme.txt"));
        touch(&annotations.join("b.bin"));
        touch(&annotations.join("deep/a.bin"));
        touch(&annotations.join("notes.txt"));

        let pairs = pair_recordings(&audio, &annotations).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].annotation, annotations.join("b.bin"));
        assert_eq!(pairs[0].audio, audio.join("site1/b.wav"));
        assert_eq!(pairs[1].annotation, annotations.join("deep/a.bin"));
        assert_eq!(pairs[1].audio, audio.join("a.flac"));
        assert_eq!(pairs[1].name(), "a");
    }

    #[test]
    fn test_missing_audio_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("audio");
        let annotations = dir.path().join("annotations");

        touch(&audio.join("a.wav"));
        touch(&annotations.join("a.bin"));
        touch(&annotations.join("z.bin"));

        match pair_recordings(&audio, &annotations) {
            Err(PairingError::MissingAudio { name, annotation }) => {
                assert_eq!(name, "z.wav");
                assert_eq!(annotation, annotations.join("z.bin"));
            }
            other => panic!("expected missing audio, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            find_files(&dir.path().join("nope"), |_| true),
            Err(PairingError::Walk { .. })
        ));
    }
}
