// ============================================================
// Layer 4 — CIFAR-10 Loader
// ============================================================
// Reads the "binary version" of CIFAR-10 from disk.
//
// File layout (https://www.cs.toronto.edu/~kriz/cifar.html):
//   data_batch_1.bin ... data_batch_5.bin   → 50 000 training images
//   test_batch.bin                          → 10 000 test images
//
// Every record is exactly 3073 bytes:
//   byte 0        label (0..=9)
//   bytes 1..1025 red plane   (32×32, row-major)
//   next 1024     green plane
//   next 1024     blue plane
//
// If the extracted directory is missing but the downloaded
// archive `cifar-10-binary.tar.gz` is present, it is unpacked
// first with tar + flate2.
//
// Reference: tar and flate2 crate documentation

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use crate::data::dataset::CifarItem;
use crate::domain::classes::NUM_CLASSES;

pub const CIFAR_SIDE: usize = 32;
pub const PIXELS_PER_IMAGE: usize = 3 * CIFAR_SIDE * CIFAR_SIDE;
pub const RECORD_LEN: usize = 1 + PIXELS_PER_IMAGE;

pub const ARCHIVE_NAME: &str = "cifar-10-binary.tar.gz";
const EXTRACTED_DIR: &str = "cifar-10-batches-bin";
const TRAIN_FILES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
const TEST_FILE: &str = "test_batch.bin";
const TEST_FILES: [&str; 1] = [TEST_FILE];

/// Which half of the dataset to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn files(self) -> &'static [&'static str] {
        match self {
            Split::Train => &TRAIN_FILES,
            Split::Test  => &TEST_FILES,
        }
    }
}

pub struct CifarLoader {
    dir: PathBuf,
}

impl CifarLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Make sure the batch files exist, extracting the archive if needed.
    /// Returns the directory that actually holds the .bin files.
    pub fn prepare(&self) -> Result<PathBuf> {
        if has_batches(&self.dir) {
            return Ok(self.dir.clone());
        }

        let nested = self.dir.join(EXTRACTED_DIR);
        if has_batches(&nested) {
            return Ok(nested);
        }

        let archive = std::iter::once(self.dir.join(ARCHIVE_NAME))
            .chain(sibling(&self.dir, ARCHIVE_NAME))
            .find(|p| p.is_file());

        let Some(archive) = archive else {
            bail!(
                "CIFAR-10 batches not found in '{}'. Download '{}' from \
                 https://www.cs.toronto.edu/~kriz/cifar.html and place it there.",
                self.dir.display(),
                ARCHIVE_NAME
            );
        };

        let target = archive.parent().unwrap_or(Path::new(".")).to_path_buf();
        tracing::info!("Extracting '{}' into '{}'", archive.display(), target.display());
        extract_archive(&archive, &target)?;

        [self.dir.clone(), target.join(EXTRACTED_DIR)]
            .into_iter()
            .find(|d| has_batches(d))
            .with_context(|| {
                format!("Archive '{}' did not contain CIFAR-10 batch files", archive.display())
            })
    }

    /// Load every record of a split, optionally capped at `limit` items
    pub fn load(&self, split: Split, limit: Option<usize>) -> Result<Vec<CifarItem>> {
        let dir = self.prepare()?;
        let mut items = Vec::new();

        for name in split.files() {
            let path = dir.join(name);
            let bytes = fs::read(&path)
                .with_context(|| format!("Cannot read '{}'", path.display()))?;
            let mut batch = parse_records(&bytes)
                .with_context(|| format!("Malformed CIFAR-10 file '{}'", path.display()))?;
            tracing::debug!("Read {} records from '{}'", batch.len(), path.display());
            items.append(&mut batch);

            if limit.is_some_and(|n| items.len() >= n) {
                break;
            }
        }

        if let Some(n) = limit {
            items.truncate(n);
        }
        Ok(items)
    }
}

/// Decode a whole batch file into labelled items
pub fn parse_records(bytes: &[u8]) -> Result<Vec<CifarItem>> {
    if bytes.len() % RECORD_LEN != 0 {
        bail!(
            "length {} is not a multiple of the {}-byte record size",
            bytes.len(),
            RECORD_LEN
        );
    }

    bytes
        .chunks_exact(RECORD_LEN)
        .enumerate()
        .map(|(i, record)| {
            let label = record[0] as usize;
            if label >= NUM_CLASSES {
                bail!("record {i} has label {label}, expected 0..{NUM_CLASSES}");
            }
            Ok(CifarItem {
                pixels: record[1..].to_vec(),
                label,
            })
        })
        .collect()
}

fn has_batches(dir: &Path) -> bool {
    dir.join(TEST_FILE).is_file() && dir.join(TRAIN_FILES[0]).is_file()
}

fn sibling(dir: &Path, name: &str) -> Option<PathBuf> {
    dir.parent().map(|p| p.join(name))
}

fn extract_archive(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("Cannot open archive '{}'", archive.display()))?;
    fs::create_dir_all(target)?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(target)
        .with_context(|| format!("Cannot extract '{}'", archive.display()))?;
    Ok(())
}
