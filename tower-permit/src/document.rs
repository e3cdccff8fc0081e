//! The document submitted to the creation endpoint.
//!
//! Field names follow the endpoint's camelCase JSON; dates are ISO-8601
//! calendar dates (`YYYY-MM-DD`).

use chrono::NaiveDate;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub description: Description,
    pub doc_id: i64,
    pub doc_status: String,
    pub doc_type: String,
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: NaiveDate,
    pub production_type: String,
    pub products: Vec<Product>,
    pub reg_date: NaiveDate,
    pub reg_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub participant_inn: String,
}

/// A single product line of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub certificate_document: String,
    pub certificate_document_date: NaiveDate,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    pub production_date: NaiveDate,
    pub tnved_code: String,
    pub uit_code: String,
    pub uitu_code: String,
}

#[cfg(test)]
pub(crate) fn sample() -> Document {
    let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    Document {
        description: Description {
            participant_inn: "7700000001".to_string(),
        },
        doc_id: 1001,
        doc_status: "NEW".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: false,
        owner_inn: "7700000001".to_string(),
        participant_inn: "7700000001".to_string(),
        producer_inn: "7700000002".to_string(),
        production_date: day,
        production_type: "OWN_PRODUCTION".to_string(),
        products: vec![Product {
            certificate_document: "CONFORMITY_CERTIFICATE".to_string(),
            certificate_document_date: day,
            certificate_document_number: "RU-123".to_string(),
            owner_inn: "7700000001".to_string(),
            producer_inn: "7700000002".to_string(),
            production_date: day,
            tnved_code: "6401100000".to_string(),
            uit_code: "010460043993125621JgXJ5.T".to_string(),
            uitu_code: String::new(),
        }],
        reg_date: day,
        reg_number: "REG-1".to_string(),
    }
}
