//! Regex patterns backing the field rule catalog.
//!
//! All patterns are case-insensitive and multi-line; the first capture group
//! carries the field value.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Structural vocabulary used for layout fingerprints
    pub static ref STRUCTURE_WORDS: Regex = Regex::new(
        r"\b(invoice|bill|receipt|total|subtotal|tax|date|customer|vendor|item|description|quantity|price|amount|number|no\.?|ref|reference)\b"
    ).unwrap();

    pub static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    // Invoice number
    pub static ref INVOICE_NUMBER_LABELED: Regex = Regex::new(
        r"(?im)invoice\s*(?:number|no\.?|#)?\s*:?\s*([A-Z0-9\-]+)"
    ).unwrap();

    pub static ref BILL_NUMBER_LABELED: Regex = Regex::new(
        r"(?im)bill\s*(?:number|no\.?)?\s*:?\s*([A-Z0-9\-]+)"
    ).unwrap();

    pub static ref REFERENCE_NUMBER: Regex = Regex::new(
        r"(?im)reference\s*:?\s*([A-Z0-9\-]+)"
    ).unwrap();

    // Dates
    pub static ref DATE_LABELED_DMY: Regex = Regex::new(
        r"(?im)date\s*:?\s*(\d{1,2}[-/]\d{1,2}[-/]\d{2,4})"
    ).unwrap();

    pub static ref DATE_ISO: Regex = Regex::new(
        r"(?im)(\d{4}-\d{2}-\d{2})"
    ).unwrap();

    pub static ref DATE_LONG: Regex = Regex::new(
        r"(?im)(\d{1,2}\s+(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\s+\d{4})"
    ).unwrap();

    // Totals
    pub static ref TOTAL_LABELED: Regex = Regex::new(
        r"(?im)total\s*:?\s*\$?\s*([\d,]+\.?\d*)"
    ).unwrap();

    pub static ref AMOUNT_DUE: Regex = Regex::new(
        r"(?im)amount\s*(?:due)?\s*:?\s*\$?\s*([\d,]+\.?\d*)"
    ).unwrap();

    pub static ref GRAND_TOTAL: Regex = Regex::new(
        r"(?im)grand\s*total\s*:?\s*\$?\s*([\d,]+\.?\d*)"
    ).unwrap();

    // Vendor
    pub static ref VENDOR_FIRST_LINE: Regex = Regex::new(
        r"(?im)^([A-Z][A-Za-z\s&]+(?:Inc|LLC|Corp|Ltd)?)"
    ).unwrap();

    pub static ref VENDOR_FROM: Regex = Regex::new(
        r"(?im)from\s*:?\s*([A-Z][A-Za-z\s&]+)"
    ).unwrap();
}
