//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over point requests from a CSV file.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - Batch reading so the replay driver can bound how much work is queued
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of PointRequests
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::PointRequest;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Malformed rows are logged, counted and skipped; they never end the
/// stream.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    malformed: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            malformed: 0,
        }
    }

    /// Number of rows skipped so far because they could not be parsed
    ///
    /// Covers unknown types, missing amounts, and ids or amounts that are
    /// not integers.
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Read up to `batch_size` requests
    ///
    /// # Returns
    ///
    /// The successfully converted requests, in file order. An empty vector
    /// means the end of the input was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<PointRequest> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(request) => batch.push(request),
                    Err(e) => {
                        self.malformed += 1;
                        warn!(error = %e, "skipping malformed request");
                    }
                },
                Some(Err(e)) => {
                    self.malformed += 1;
                    warn!(error = %e, "skipping unparsable CSV row");
                }
                None => break,
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionKind;
    use futures::io::Cursor;

    #[tokio::test]
    async fn test_async_reader_read_batch() {
        let csv_content = "type,user,amount\ncharge,1,100\nuse,1,50\ncharge,2,200\n";
        let mut reader = AsyncReader::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].kind, TransactionKind::Charge);
        assert_eq!(batch[0].amount, 100);
        assert_eq!(batch[1].kind, TransactionKind::Use);
        assert_eq!(batch[1].amount, 50);

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user, 2);

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_empty_csv() {
        let mut reader = AsyncReader::new(Cursor::new("type,user,amount\n".as_bytes()));

        assert!(reader.read_batch(10).await.is_empty());
    }

    #[tokio::test]
    async fn test_async_reader_skips_malformed_rows() {
        let csv_content = "type,user,amount\n\
                           charge,1,100\n\
                           deposit,1,5\n\
                           charge,abc,5\n\
                           use,1,\n\
                           use, 1 , 30 \n";
        let mut reader = AsyncReader::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(10).await;

        assert_eq!(
            batch,
            vec![
                PointRequest {
                    kind: TransactionKind::Charge,
                    user: 1,
                    amount: 100
                },
                PointRequest {
                    kind: TransactionKind::Use,
                    user: 1,
                    amount: 30
                },
            ]
        );
        assert_eq!(reader.malformed(), 3);
    }

    #[tokio::test]
    async fn test_async_reader_counts_non_integer_values() {
        let csv_content = "type,user,amount
                           charge,1.5,10
                           charge,1,2.5
                           charge,2,10
";
        let mut reader = AsyncReader::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(10).await;

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].user, 2);
        assert_eq!(reader.malformed(), 2);
    }
}
