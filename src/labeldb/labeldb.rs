// SPDX-License-Identifier: GPL-2.0-or-later

use common::ImageId;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    collections::{HashMap, HashSet},
    io::SeekFrom,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufWriter},
};

// database {
//     file.data
//     file.payload
// }
//
// file.data {
//     magic_bytes: [u8; 25]
//     version: u8
//     [entry]
// }
//
// entry { // 72 bytes.
//     key: [u8; 64] // Image id, zero padded.
//     payload_offset: u32
//     payload_size: u32
// }
//
// file.payload: newline-terminated JSON documents.

const MAGIC_BYTES: [u8; 25] = *b"hoilabel\0labeldb\0\0\x89\x85\x80\x85\0\0v";
const API_VERSION: u8 = 0;

const HEADER_SIZE: usize = 26;

const KEY_SIZE: usize = 64;

// 64 + 4 + 4.
const ENTRY_SIZE: usize = 72;

fn db_paths(path_base: &Path) -> (PathBuf, PathBuf) {
    (
        path_base.with_extension("data"),
        path_base.with_extension("payload"),
    )
}

/// Write-once keyed container writer. Keys are image ids; each key maps to
/// one JSON payload. Must be finished before being dropped.
pub struct Writer {
    data_file: BufWriter<File>,
    payload_file: BufWriter<File>,
    payload_pos: u32,
    keys: HashSet<ImageId>,
}

#[derive(Debug, Error)]
pub enum CreateDbError {
    #[error("open data file: {0}")]
    OpenDataFile(std::io::Error),

    #[error("write header: {0}")]
    WriteHeader(std::io::Error),

    #[error("open payload file: {0}")]
    OpenPayloadFile(std::io::Error),
}

#[derive(Debug, Error)]
pub enum PutError {
    #[error("duplicate key: '{0}'")]
    DuplicateKey(ImageId),

    #[error("serialize payload: {0}")]
    SerializePayload(#[from] serde_json::Error),

    #[error("payload too big: {0}")]
    PayloadTooBig(usize),

    #[error("write: {0}")]
    Write(std::io::Error),

    #[error("add")]
    Add,
}

#[derive(Debug, Error)]
pub enum FinishError {
    #[error("flush: {0}")]
    Flush(std::io::Error),
}

impl Writer {
    pub async fn create(path_base: &Path) -> Result<Self, CreateDbError> {
        use CreateDbError::*;
        let (data_path, payload_path) = db_paths(path_base);

        let mut data_file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&data_path)
            .await
            .map_err(OpenDataFile)?;

        let header = [MAGIC_BYTES.as_slice(), &API_VERSION.to_be_bytes()].concat();
        data_file.write_all(&header).await.map_err(WriteHeader)?;

        let payload_file = tokio::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&payload_path)
            .await
            .map_err(OpenPayloadFile)?;

        Ok(Self {
            data_file: BufWriter::new(data_file),
            payload_file: BufWriter::new(payload_file),
            payload_pos: 0,
            keys: HashSet::new(),
        })
    }

    pub async fn put<T: Serialize + Sync>(
        &mut self,
        key: &ImageId,
        value: &T,
    ) -> Result<(), PutError> {
        use PutError::*;
        if self.keys.contains(key) {
            return Err(DuplicateKey(key.clone()));
        }

        let payload = serde_json::to_vec(value)?;
        let Ok(payload_len) = u32::try_from(payload.len()) else {
            return Err(PayloadTooBig(payload.len()));
        };

        self.payload_file.write_all(&payload).await.map_err(Write)?;
        self.payload_file.write_all(b"\n").await.map_err(Write)?;

        let entry = encode_entry(key, self.payload_pos, payload_len);
        self.data_file.write_all(&entry).await.map_err(Write)?;

        self.payload_pos = self
            .payload_pos
            .checked_add(payload_len)
            .and_then(|v| v.checked_add(1))
            .ok_or(Add)?;
        self.keys.insert(key.clone());
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub async fn finish(mut self) -> Result<(), FinishError> {
        use FinishError::*;
        self.payload_file.flush().await.map_err(Flush)?;
        self.data_file.flush().await.map_err(Flush)?;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
struct IndexEntry {
    payload_offset: u32,
    payload_size: u32,
}

/// Random-access reader. The whole index is loaded up front; payloads are
/// read on demand.
pub struct Reader {
    payload_file: File,
    index: HashMap<ImageId, IndexEntry>,

    // Insertion order.
    keys: Vec<ImageId>,
}

#[derive(Debug, Error)]
pub enum OpenDbError {
    #[error("open data file: {0} {1}")]
    OpenDataFile(PathBuf, std::io::Error),

    #[error("read header: {0}")]
    ReadHeader(std::io::Error),

    #[error("mismatched magic bytes")]
    MismatchedMagicBytes,

    #[error("unknown api version: {0}")]
    UnknownVersion(u8),

    #[error("read index: {0}")]
    ReadIndex(std::io::Error),

    #[error("truncated index, {0} trailing bytes")]
    TruncatedIndex(usize),

    #[error("entry {0}: {1}")]
    DecodeEntry(usize, DecodeEntryError),

    #[error("duplicate key: '{0}'")]
    DuplicateKey(ImageId),

    #[error("open payload file: {0} {1}")]
    OpenPayloadFile(PathBuf, std::io::Error),
}

#[derive(Debug, Error)]
pub enum GetError {
    #[error("seek: {0}")]
    Seek(std::io::Error),

    #[error("read: {0}")]
    Read(std::io::Error),

    #[error("deserialize payload: {0}")]
    DeserializePayload(#[from] serde_json::Error),
}

impl Reader {
    pub async fn open(path_base: &Path) -> Result<Self, OpenDbError> {
        use OpenDbError::*;
        let (data_path, payload_path) = db_paths(path_base);

        let mut data_file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&data_path)
            .await
            .map_err(|e| OpenDataFile(data_path, e))?;

        let mut header = [0; HEADER_SIZE];
        data_file
            .read_exact(&mut header)
            .await
            .map_err(ReadHeader)?;
        if header[..MAGIC_BYTES.len()] != MAGIC_BYTES {
            return Err(MismatchedMagicBytes);
        }
        let version = header[HEADER_SIZE - 1];
        if version != API_VERSION {
            return Err(UnknownVersion(version));
        }

        let mut raw_index = Vec::new();
        data_file
            .read_to_end(&mut raw_index)
            .await
            .map_err(ReadIndex)?;
        if raw_index.len() % ENTRY_SIZE != 0 {
            return Err(TruncatedIndex(raw_index.len() % ENTRY_SIZE));
        }

        let mut index = HashMap::new();
        let mut keys = Vec::new();
        for (i, raw_entry) in raw_index.chunks_exact(ENTRY_SIZE).enumerate() {
            let raw_entry: &[u8; ENTRY_SIZE] =
                raw_entry.try_into().expect("chunk size should match");
            let (key, entry) = decode_entry(raw_entry).map_err(|e| DecodeEntry(i, e))?;
            if index.insert(key.clone(), entry).is_some() {
                return Err(DuplicateKey(key));
            }
            keys.push(key);
        }

        let payload_file = tokio::fs::OpenOptions::new()
            .read(true)
            .open(&payload_path)
            .await
            .map_err(|e| OpenPayloadFile(payload_path, e))?;

        Ok(Self {
            payload_file,
            index,
            keys,
        })
    }

    /// Returns `None` for unknown keys.
    pub async fn get<T: DeserializeOwned>(
        &mut self,
        key: &ImageId,
    ) -> Result<Option<T>, GetError> {
        use GetError::*;
        let Some(entry) = self.index.get(key).copied() else {
            return Ok(None);
        };

        self.payload_file
            .seek(SeekFrom::Start(entry.payload_offset.into()))
            .await
            .map_err(Seek)?;

        let mut payload = vec![0; usize::try_from(entry.payload_size).expect("u32 should fit usize")];
        self.payload_file
            .read_exact(&mut payload)
            .await
            .map_err(Read)?;

        Ok(Some(serde_json::from_slice(&payload)?))
    }

    #[must_use]
    pub fn contains(&self, key: &ImageId) -> bool {
        self.index.contains_key(key)
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> &[ImageId] {
        &self.keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn encode_entry(key: &ImageId, payload_offset: u32, payload_size: u32) -> [u8; ENTRY_SIZE] {
    let mut buf = [0; ENTRY_SIZE];
    // Image ids are validated to at most 64 bytes.
    buf[..key.len()].copy_from_slice(key.as_bytes());
    buf[KEY_SIZE..KEY_SIZE + 4].copy_from_slice(&payload_offset.to_be_bytes());
    buf[KEY_SIZE + 4..].copy_from_slice(&payload_size.to_be_bytes());
    buf
}

#[derive(Debug, Error)]
pub enum DecodeEntryError {
    #[error("key is not utf8: {0}")]
    KeyUtf8(std::str::Utf8Error),

    #[error("bad key: {0}")]
    BadKey(common::ParseImageIdError),
}

fn decode_entry(buf: &[u8; ENTRY_SIZE]) -> Result<(ImageId, IndexEntry), DecodeEntryError> {
    use DecodeEntryError::*;
    let key_len = buf[..KEY_SIZE]
        .iter()
        .position(|b| *b == 0)
        .unwrap_or(KEY_SIZE);
    let key: ImageId = std::str::from_utf8(&buf[..key_len])
        .map_err(KeyUtf8)?
        .parse()
        .map_err(BadKey)?;

    let payload_offset = u32::from_be_bytes(
        buf[KEY_SIZE..KEY_SIZE + 4]
            .try_into()
            .expect("size should match"),
    );
    let payload_size = u32::from_be_bytes(
        buf[KEY_SIZE + 4..]
            .try_into()
            .expect("size should match"),
    );
    Ok((
        key,
        IndexEntry {
            payload_offset,
            payload_size,
        },
    ))
}
