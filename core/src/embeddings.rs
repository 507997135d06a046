//! Embedding input parsing: the precomputed `id<TAB>label<TAB>floats` file and
//! query embeddings returned by the external embedding generator.

use crate::index::DocId;
use thiserror::Error;

/// One parsed line of the embeddings file.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingLine {
    pub doc_id: DocId,
    pub vector: Vec<f32>,
}

/// Why a single embeddings line was skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineError {
    #[error("expected three tab-separated fields")]
    MissingFields,
    #[error("unparsable id {0:?}")]
    BadId(String),
    #[error("unparsable float {0:?}")]
    BadFloat(String),
}

/// `"L<digits>"` or bare digits -> id.
pub fn parse_embedding_id(id: &str) -> Option<DocId> {
    let id = id.trim();
    let digits = id.strip_prefix('L').unwrap_or(id);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Parse `id<TAB>label<TAB>f1 f2 ...`. The label is ignored. Any malformed
/// float rejects the whole line.
pub fn parse_embedding_line(line: &str) -> Result<EmbeddingLine, LineError> {
    let mut fields = line.splitn(3, '\t');
    let (Some(id), Some(_label), Some(floats)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(LineError::MissingFields);
    };
    let doc_id = parse_embedding_id(id).ok_or_else(|| LineError::BadId(id.to_string()))?;
    let vector = floats
        .split_whitespace()
        .map(|tok| tok.parse::<f32>().map_err(|_| LineError::BadFloat(tok.to_string())))
        .collect::<Result<Vec<f32>, LineError>>()?;
    Ok(EmbeddingLine { doc_id, vector })
}

/// Parse a comma- or whitespace-separated float sequence. Unparsable elements
/// are dropped individually rather than failing the whole query.
pub fn parse_query_embedding(text: &str) -> Vec<f32> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .filter_map(|tok| match tok.parse::<f32>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::debug!(token = tok, "skipping unparsable embedding element");
                None
            }
        })
        .collect()
}
