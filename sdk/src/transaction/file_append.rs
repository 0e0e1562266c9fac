//! Appends bytes to a file, split into chunks when the contents are large.

use super::chunk::{ChunkPlan, ChunkRange};
use super::lifecycle::{unexpected_body, Transaction, TransactionData};
use crate::codec::{BodyData, FileAppendData};
use crate::config;
use crate::error::{Error, Result};
use crate::id::{FileId, LedgerId, ValidateChecksums};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAppend {
    pub file_id: Option<FileId>,
    pub contents: Vec<u8>,
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for FileAppend {
    fn default() -> Self {
        Self {
            file_id: None,
            contents: Vec::new(),
            chunk_size: config::DEFAULT_CHUNK_SIZE,
            max_chunks: config::DEFAULT_MAX_CHUNKS,
        }
    }
}

pub type FileAppendTransaction = Transaction<FileAppend>;

impl Transaction<FileAppend> {
    pub fn set_file_id(&mut self, file_id: FileId) -> Result<&mut Self> {
        self.data_mut()?.file_id = Some(file_id);
        Ok(self)
    }

    pub fn set_contents(&mut self, contents: impl Into<Vec<u8>>) -> Result<&mut Self> {
        self.data_mut()?.contents = contents.into();
        Ok(self)
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if chunk_size == 0 {
            return Err(Error::argument("chunkSize must be greater than zero"));
        }
        self.data_mut()?.chunk_size = chunk_size;
        Ok(self)
    }

    pub fn set_max_chunks(&mut self, max_chunks: usize) -> Result<&mut Self> {
        self.require_not_frozen()?;
        if max_chunks == 0 {
            return Err(Error::argument("maxChunks must be greater than zero"));
        }
        self.data_mut()?.max_chunks = max_chunks;
        Ok(self)
    }

    pub fn file_id(&self) -> Option<&FileId> {
        self.data().file_id.as_ref()
    }

    pub fn contents(&self) -> &[u8] {
        &self.data().contents
    }

    pub fn chunk_size(&self) -> usize {
        self.data().chunk_size
    }

    pub fn max_chunks(&self) -> usize {
        self.data().max_chunks
    }
}

impl ValidateChecksums for FileAppend {
    fn validate_checksums(&self, ledger: &LedgerId) -> Result<()> {
        self.file_id.validate_checksums(ledger)
    }
}

impl TransactionData for FileAppend {
    const NAME: &'static str = "FileAppendTransaction";

    fn chunk_plan(&self) -> Option<ChunkPlan> {
        Some(ChunkPlan {
            payload_len: self.contents.len(),
            chunk_size: self.chunk_size,
            max_chunks: self.max_chunks,
        })
    }

    fn body_data(&self, chunk: &ChunkRange) -> Result<BodyData> {
        let contents = self
            .contents
            .get(chunk.range.clone())
            .ok_or_else(|| {
                Error::state(format!(
                    "chunk {} range {:?} is outside the {}-byte payload",
                    chunk.index,
                    chunk.range,
                    self.contents.len()
                ))
            })?
            .to_vec();
        Ok(BodyData::FileAppend(FileAppendData {
            file_id: self.file_id.clone(),
            contents,
        }))
    }

    /// Reassembles the payload. The chunk size is recovered from the first
    /// chunk, which is always full when there is more than one.
    fn from_body_data(chunks: Vec<BodyData>) -> Result<Self> {
        let count = chunks.len();
        let mut file_id = None;
        let mut contents = Vec::new();
        let mut first_len = 0;

        for (index, chunk) in chunks.into_iter().enumerate() {
            let data = match chunk {
                BodyData::FileAppend(data) => data,
                other => return Err(unexpected_body::<Self>(&other)),
            };
            if index == 0 {
                file_id = data.file_id;
                first_len = data.contents.len();
            } else if data.file_id != file_id {
                return Err(Error::decoding(format!(
                    "chunk {index} targets a different file than chunk 0"
                )));
            }
            contents.extend_from_slice(&data.contents);
        }

        let chunk_size = if count > 1 {
            first_len
        } else {
            first_len.max(config::DEFAULT_CHUNK_SIZE)
        };
        if chunk_size == 0 {
            return Err(Error::decoding("chunked file append with an empty first chunk"));
        }

        Ok(Self {
            file_id,
            contents,
            chunk_size,
            max_chunks: count.max(config::DEFAULT_MAX_CHUNKS),
        })
    }

    /// Chunking knobs are local settings and stay out of the rendering.
    fn canonical_fields(&self) -> String {
        format!(
            "FileAppend {{ file_id: {:?}, contents: {} }}",
            self.file_id,
            hex::encode(&self.contents)
        )
    }
}
