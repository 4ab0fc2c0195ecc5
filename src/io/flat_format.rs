//! Flat record encoding for snapshot files
//!
//! Every snapshot file is a sequence of one-line records. Two record shapes
//! share a file:
//! - header records, `|`-delimited (e.g. `A1|Bob|150`)
//! - detail records, `,`-delimited (e.g. `A1,2024-05-20,200,topup`)
//!
//! Identifiers never contain either delimiter, so the first delimiter on a
//! line tells the two shapes apart. Free-text fields are quoted by the `csv`
//! writer when they contain a delimiter, a quote, or a line break, which is
//! why record splitting has to be quote-aware.
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::MarketError;
use csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Delimiter of header records
pub const HEADER_DELIMITER: u8 = b'|';

/// Delimiter of detail records
pub const DETAIL_DELIMITER: u8 = b',';

/// Shape of a record, decided by its first delimiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Header,
    Detail,
}

impl RecordKind {
    pub fn delimiter(self) -> u8 {
        match self {
            RecordKind::Header => HEADER_DELIMITER,
            RecordKind::Detail => DETAIL_DELIMITER,
        }
    }
}

/// `accounts.txt` header: `accountID|ownerName|balance`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AccountRecord {
    pub id: String,
    pub owner: String,
    pub balance: String,
}

/// `accounts.txt` detail: `accountID,date,amount,note`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntryRecord {
    pub account: String,
    pub date: String,
    pub amount: String,
    pub note: String,
}

/// `items.txt` record: `itemID|name|price|stock|soldCount`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: String,
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub sold: u32,
}

/// `buyers.txt` / `sellers.txt` header: `userID|username|credential`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PrincipalRecord {
    pub id: String,
    pub username: String,
    pub credential: String,
}

/// `buyers.txt` detail: `userID,orderID`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BuyerOrderRecord {
    pub buyer: String,
    pub order: String,
}

/// `sellers.txt` detail: `userID,item,itemID` or `userID,sale,orderID`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SellerLinkRecord {
    pub seller: String,
    pub tag: String,
    pub target: String,
}

/// Tag of a seller detail line listing an owned item
pub const SELLER_ITEM_TAG: &str = "item";

/// Tag of a seller detail line listing a sale
pub const SELLER_SALE_TAG: &str = "sale";

/// `transactions.txt` record:
/// `transactionID|date|buyerID|sellerID|itemID|itemName|quantity|totalPrice|statusCode`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: String,
    pub date: String,
    pub buyer: String,
    pub seller: String,
    pub item: String,
    pub item_name: String,
    pub quantity: u32,
    pub total: String,
    pub status: u8,
}

/// Append one record to `out`, terminated by `\n`
///
/// # Arguments
///
/// * `out` - Buffer holding the file being rendered
/// * `record` - Record to serialize
/// * `kind` - Header or detail shape, which picks the delimiter
///
/// # Errors
///
/// Returns `MarketError::IoError` if the record cannot be serialized.
pub fn write_record<T: Serialize>(
    out: &mut String,
    record: &T,
    kind: RecordKind,
) -> Result<(), MarketError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(kind.delimiter())
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.serialize(record).map_err(|e| MarketError::IoError {
        message: format!("Failed to serialize record: {}", e),
    })?;

    let bytes = writer.into_inner().map_err(|e| MarketError::IoError {
        message: format!("Failed to flush record: {}", e),
    })?;
    let line = String::from_utf8(bytes).map_err(|e| MarketError::IoError {
        message: format!("Record is not valid UTF-8: {}", e),
    })?;

    out.push_str(&line);
    Ok(())
}

/// Parse one record of the given shape
///
/// # Errors
///
/// Returns the `csv` error if the text does not hold a record of type `T`.
pub fn read_record<T: DeserializeOwned>(text: &str, kind: RecordKind) -> Result<T, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(kind.delimiter())
        .from_reader(text.as_bytes());

    let record = reader.deserialize().next();
    record.unwrap_or_else(|| {
        Err(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "empty record",
        )))
    })
}

/// Decide whether a record is a header or a detail line
///
/// Returns `None` when the record contains neither delimiter.
pub fn classify(record: &str) -> Option<RecordKind> {
    record.bytes().find_map(|b| match b {
        HEADER_DELIMITER => Some(RecordKind::Header),
        DETAIL_DELIMITER => Some(RecordKind::Detail),
        _ => None,
    })
}

/// Split file contents into records, honouring quoted line breaks
///
/// Each record is returned with the 1-based line number it starts on.
/// Blank lines are skipped and a trailing `\r` is dropped.
pub fn split_records(text: &str) -> Vec<(u64, &str)> {
    let mut records = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    let mut line = 1u64;
    let mut start_line = 1u64;

    for (pos, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '\n' => {
                if !in_quotes {
                    push_record(&mut records, start_line, &text[start..pos]);
                    start = pos + 1;
                    start_line = line + 1;
                }
                line += 1;
            }
            _ => {}
        }
    }
    push_record(&mut records, start_line, &text[start..]);

    records
}

fn push_record<'a>(records: &mut Vec<(u64, &'a str)>, line: u64, raw: &'a str) {
    let record = raw.strip_suffix('\r').unwrap_or(raw);
    if !record.trim().is_empty() {
        records.push((line, record));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(note: &str) -> EntryRecord {
        EntryRecord {
            account: "A1".to_string(),
            date: "2024-05-20".to_string(),
            amount: "-50".to_string(),
            note: note.to_string(),
        }
    }

    #[test]
    fn test_write_header_and_detail_records() {
        let mut out = String::new();
        write_record(
            &mut out,
            &AccountRecord {
                id: "A1".to_string(),
                owner: "Bob".to_string(),
                balance: "150".to_string(),
            },
            RecordKind::Header,
        )
        .unwrap();
        write_record(&mut out, &entry("withdraw"), RecordKind::Detail).unwrap();

        assert_eq!(out, "A1|Bob|150\nA1,2024-05-20,-50,withdraw\n");
    }

    #[rstest]
    #[case::plain("topup")]
    #[case::comma("coffee, large")]
    #[case::pipe("a|b")]
    #[case::quote("the \"good\" one")]
    #[case::newline("line one\nline two")]
    #[case::empty("")]
    fn test_free_text_survives_a_file_round_trip(#[case] note: &str) {
        let mut out = String::new();
        write_record(&mut out, &entry(note), RecordKind::Detail).unwrap();
        write_record(&mut out, &entry("next"), RecordKind::Detail).unwrap();

        let records = split_records(&out);
        assert_eq!(records.len(), 2);

        let (line, text) = records[0];
        assert_eq!(line, 1);
        assert_eq!(classify(text), Some(RecordKind::Detail));
        let parsed: EntryRecord = read_record(text, RecordKind::Detail).unwrap();
        assert_eq!(parsed, entry(note));

        let parsed: EntryRecord = read_record(records[1].1, RecordKind::Detail).unwrap();
        assert_eq!(parsed.note, "next");
    }

    #[rstest]
    #[case::header("A1|Bob, Jr|0", Some(RecordKind::Header))]
    #[case::detail("A1,2024-05-20,5,a|b", Some(RecordKind::Detail))]
    #[case::neither("garbage", None)]
    fn test_classify(#[case] record: &str, #[case] expected: Option<RecordKind>) {
        assert_eq!(classify(record), expected);
    }

    #[test]
    fn test_split_records_tracks_line_numbers() {
        let text = "A1|Bob|0\r\n\nA1,2024-05-20,0,\"two\nlines\"\nB1|Sue|0";
        let records = split_records(text);

        assert_eq!(
            records,
            vec![
                (1, "A1|Bob|0"),
                (3, "A1,2024-05-20,0,\"two\nlines\""),
                (5, "B1|Sue|0"),
            ]
        );
    }

    #[test]
    fn test_write_record_reports_unserializable_record_as_io_error() {
        #[derive(Serialize)]
        struct Nested {
            id: String,
            tags: std::collections::BTreeMap<String, String>,
        }

        let record = Nested {
            id: "A1".to_string(),
            tags: [("k".to_string(), "v".to_string())].into_iter().collect(),
        };
        let mut out = String::new();

        let result = write_record(&mut out, &record, RecordKind::Header);

        assert!(matches!(result, Err(MarketError::IoError { .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_read_record_rejects_bad_numbers() {
        let result: Result<ItemRecord, _> = read_record("I1|Sword|50|many|0", RecordKind::Header);
        assert!(result.is_err());
    }
}
