//! CSV import into an existing DynamoDB table.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use csv::ReaderBuilder;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::dynamodb::{FieldType, Item, Schema, TableApi, BATCH_WRITE_LIMIT};
use crate::error::{AppError, Result};
use crate::polling::{poll_until, Poll, PollSettings};

pub const SUPPORTED_FILE_FORMATS: &[&str] = &["CSV"];

/// Writes the rows of a file into a table, typed by its attribute definitions.
pub struct Importer {
    tables: Arc<dyn TableApi>,
    retry: PollSettings,
}

impl Importer {
    pub fn new(tables: Arc<dyn TableApi>, retry: PollSettings) -> Self {
        Self { tables, retry }
    }

    /// Imports `path` into `table_name` and returns the number of records written.
    pub async fn import(
        &self,
        path: &Path,
        table_name: &str,
        exported_from_aws: bool,
    ) -> Result<usize> {
        check_format(path)?;

        let description = self
            .tables
            .describe_table(table_name)
            .await?
            .ok_or_else(|| AppError::TableNotFound {
                table_name: table_name.to_string(),
            })?;
        let schema = Schema::from_attribute_definitions(description.attribute_definitions());
        debug!("Attribute types of {table_name}: {:?}", schema.fields());

        let records = read_records(File::open(path)?, &schema, exported_from_aws)?;
        info!(
            "Importing {} records from {} to {table_name}",
            records.len(),
            path.display()
        );

        let written = self.write_records(table_name, records).await?;
        info!("{written} records imported to {table_name}");
        Ok(written)
    }

    /// Writes records in input order, one BatchWriteItem call per chunk of
    /// `BATCH_WRITE_LIMIT`. Unprocessed items of a chunk are resubmitted
    /// before moving on to the next chunk.
    pub async fn write_records(&self, table_name: &str, records: Vec<Item>) -> Result<usize> {
        let total = records.len();

        for (index, chunk) in records.chunks(BATCH_WRITE_LIMIT).enumerate() {
            debug!("Writing batch {} ({} items)", index + 1, chunk.len());

            let pending = &Mutex::new(chunk.to_vec());
            poll_until(
                &format!("batch {} of {table_name} to be written", index + 1),
                "Some items were not processed, resubmitting them",
                &self.retry,
                || async move {
                    let mut pending = pending.lock().await;
                    let items = std::mem::take(&mut *pending);
                    *pending = self.tables.batch_put(table_name, items).await?;

                    Ok(if pending.is_empty() {
                        Poll::Ready(())
                    } else {
                        debug!("{} items left unprocessed", pending.len());
                        Poll::Pending
                    })
                },
            )
            .await?;
        }

        Ok(total)
    }
}

fn check_format(path: &Path) -> Result<()> {
    let is_csv = path
        .extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));

    if is_csv {
        Ok(())
    } else {
        Err(AppError::UnsupportedFormat {
            path: path.to_path_buf(),
            supported: SUPPORTED_FILE_FORMATS,
        })
    }
}

/// Reads CSV rows (header row required) into typed items.
pub fn read_records<R: Read>(
    reader: R,
    schema: &Schema,
    exported_from_aws: bool,
) -> Result<Vec<Item>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header_name(header, exported_from_aws))
        .collect();

    reader
        .records()
        .enumerate()
        .map(|(index, record)| {
            let record = record?;
            headers
                .iter()
                .zip(record.iter())
                .try_fold(Item::new(), |item, (column, value)| {
                    coerce(item, column, value, schema.field_type(column), index + 1)
                })
        })
        .collect()
}

/// Strips the ` (TYPE)` suffix the DynamoDB console adds to exported headers.
pub fn header_name(header: &str, exported_from_aws: bool) -> String {
    if !exported_from_aws {
        return header.to_string();
    }

    match header
        .strip_suffix(')')
        .and_then(|rest| rest.rsplit_once(" ("))
    {
        Some((name, type_tag))
            if !type_tag.is_empty() && type_tag.chars().all(|c| c.is_ascii_uppercase()) =>
        {
            name.to_string()
        }
        _ => header.to_string(),
    }
}

fn coerce(
    item: Item,
    column: &str,
    value: &str,
    field_type: Option<FieldType>,
    row: usize,
) -> Result<Item> {
    if value.is_empty() {
        return Ok(item.set_null(column));
    }

    Ok(match field_type {
        Some(FieldType::Number) => {
            let number = value
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::InvalidNumber {
                    row,
                    column: column.to_string(),
                    value: value.to_string(),
                })?;
            item.set_integer(column, number)
        }
        Some(FieldType::Binary) => item.set_binary(column, value.as_bytes()),
        Some(FieldType::String) | None => item.set_string(column, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamodb::MockTableApi;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tokio::time::Duration;

    fn users_schema() -> Schema {
        Schema::new()
            .add_field("id", FieldType::Number)
            .add_field("email", FieldType::String)
    }

    fn retry() -> PollSettings {
        PollSettings {
            step: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }

    fn numbered(count: i64) -> Vec<Item> {
        (0..count).map(|n| Item::new().set_integer("id", n)).collect()
    }

    #[test]
    fn coerces_by_declared_type() {
        let csv = "id,email\n5,a@b.com\n";
        let records = read_records(Cursor::new(csv), &users_schema(), false).unwrap();

        assert_eq!(
            records,
            vec![Item::new().set_integer("id", 5).set_string("email", "a@b.com")]
        );
    }

    #[test]
    fn undeclared_columns_stay_strings_and_empty_cells_are_null() {
        let schema = users_schema().add_field("avatar", FieldType::Binary);
        let csv = "id,email,age,avatar\n7,,42,png\n";
        let records = read_records(Cursor::new(csv), &schema, false).unwrap();

        let record = &records[0];
        assert_eq!(record.get_integer("id"), Some(7));
        assert!(record.is_null("email"));
        assert_eq!(record.get_string("age"), Some(&"42".to_string()));
        assert_eq!(record.get_binary("avatar"), Some(&b"png"[..]));
    }

    #[test]
    fn exported_headers_lose_their_type_suffix() {
        assert_eq!(header_name("email (S)", true), "email");
        assert_eq!(header_name("scores (NS)", true), "scores");
        assert_eq!(header_name("email (S)", false), "email (S)");
        assert_eq!(header_name("email", true), "email");
        assert_eq!(header_name("note (draft)", true), "note (draft)");

        let csv = "id (N),email (S)\n5,a@b.com\n";
        let records = read_records(Cursor::new(csv), &users_schema(), true).unwrap();
        assert_eq!(records[0].get_integer("id"), Some(5));
    }

    #[test]
    fn non_integer_in_number_column_is_rejected() {
        let csv = "id,email\n1,a@b.com\nabc,c@d.com\n";
        let err = read_records(Cursor::new(csv), &users_schema(), false).unwrap_err();

        assert!(matches!(
            err,
            AppError::InvalidNumber { row: 2, ref column, ref value } if column == "id" && value == "abc"
        ));
    }

    #[test]
    fn only_csv_files_are_supported() {
        assert!(check_format(Path::new("users.csv")).is_ok());
        assert!(check_format(Path::new("USERS.CSV")).is_ok());

        let err = check_format(Path::new("users.json")).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat { .. }));
        assert_eq!(err.exit_code(), 42);
        assert!(check_format(Path::new("users")).is_err());
    }

    #[tokio::test]
    async fn unsupported_file_makes_no_call() {
        let mut tables = MockTableApi::new();
        tables.expect_describe_table().never();
        tables.expect_batch_put().never();

        let importer = Importer::new(Arc::new(tables), retry());
        let err = importer
            .import(Path::new("users.xlsx"), "users", false)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFormat { .. }));
    }

    #[tokio::test]
    async fn missing_table_is_reported() {
        let mut tables = MockTableApi::new();
        tables.expect_describe_table().returning(|_| Ok(None));
        tables.expect_batch_put().never();

        let importer = Importer::new(Arc::new(tables), retry());
        let err = importer
            .import(Path::new("users.csv"), "users", false)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::TableNotFound { ref table_name } if table_name == "users"));
    }

    #[tokio::test]
    async fn writes_in_ordered_chunks_of_25() {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&batches);

        let mut tables = MockTableApi::new();
        tables
            .expect_batch_put()
            .withf(|table_name, _| table_name == "users")
            .times(3)
            .returning(move |_, items| {
                recorded.lock().unwrap().push(items);
                Ok(Vec::new())
            });

        let records = numbered(60);
        let importer = Importer::new(Arc::new(tables), retry());
        let written = importer.write_records("users", records.clone()).await.unwrap();

        assert_eq!(written, 60);
        let batches = batches.lock().unwrap();
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 10]);
        assert_eq!(batches.concat(), records);
    }

    #[tokio::test]
    async fn no_rows_means_no_call() {
        let mut tables = MockTableApi::new();
        tables.expect_batch_put().never();

        let importer = Importer::new(Arc::new(tables), retry());
        assert_eq!(importer.write_records("users", Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unprocessed_items_are_resubmitted() {
        let batches = Arc::new(Mutex::new(Vec::<Vec<Item>>::new()));
        let recorded = Arc::clone(&batches);

        let mut tables = MockTableApi::new();
        tables.expect_batch_put().returning(move |_, items| {
            let mut batches = recorded.lock().unwrap();
            batches.push(items.clone());
            // The first call leaves the last two items behind.
            Ok(if batches.len() == 1 {
                items[items.len() - 2..].to_vec()
            } else {
                Vec::new()
            })
        });

        let importer = Importer::new(Arc::new(tables), retry());
        importer.write_records("users", numbered(5)).await.unwrap();

        let batches = batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1], numbered(5)[3..].to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn items_never_processed_time_out() {
        let mut tables = MockTableApi::new();
        tables
            .expect_batch_put()
            .returning(|_, items| Ok(items));

        let importer = Importer::new(Arc::new(tables), retry());
        let err = importer.write_records("users", numbered(3)).await.unwrap_err();

        assert!(matches!(err, AppError::PollTimeout { .. }));
    }

    #[tokio::test]
    async fn write_errors_are_propagated() {
        let mut tables = MockTableApi::new();
        tables.expect_batch_put().times(1).returning(|_, _| {
            Err(AppError::Service {
                service: "DynamoDB",
                code: Some("ValidationException".to_string()),
                message: "One or more parameter values were invalid".to_string(),
            })
        });

        let importer = Importer::new(Arc::new(tables), retry());
        let err = importer.write_records("users", numbered(30)).await.unwrap_err();

        assert_eq!(err.exit_code(), 42);
    }
}
