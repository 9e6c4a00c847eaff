// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use time::Date;
use time::macros::format_description;

use crate::numeric::parse_number_input;
use crate::{
    FieldDescriptor, FieldKind, FieldValue, FieldValues, FillInContext, SavePayload,
    file_display_name, is_spreadsheet_name,
};

pub const FIELDS_PER_ROW: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Number,
    Date,
    Text,
}

impl InputType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Date => "date",
            Self::Text => "text",
        }
    }

    pub const fn for_field(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Number => Self::Number,
            FieldKind::Date => Self::Date,
            FieldKind::Text => Self::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormInput {
    pub name: String,
    pub input_type: InputType,
    pub required: bool,
}

impl FormInput {
    pub fn dom_id(&self) -> String {
        format!("campo-{}", self.name)
    }

    pub fn label(&self) -> String {
        format!("{}:", self.name)
    }

    /// `step="any"` lets number inputs take decimals.
    pub fn step(&self) -> Option<&'static str> {
        (self.input_type == InputType::Number).then_some("any")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormLayout {
    pub rows: Vec<Vec<FormInput>>,
}

impl FormLayout {
    pub fn inputs(&self) -> impl Iterator<Item = &FormInput> {
        self.rows.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn build_form(fields: &[FieldDescriptor]) -> FormLayout {
    let inputs = fields
        .iter()
        .map(|field| FormInput {
            name: field.name.clone(),
            input_type: InputType::for_field(field.kind),
            required: true,
        })
        .collect::<Vec<_>>();

    FormLayout {
        rows: inputs
            .chunks(FIELDS_PER_ROW)
            .map(<[FormInput]>::to_vec)
            .collect(),
    }
}

/// Value a native `type="date"` input reports: an ISO date or nothing.
pub fn normalize_date_input(raw: &str) -> String {
    let trimmed = raw.trim();
    match Date::parse(trimmed, format_description!("[year]-[month]-[day]")) {
        Ok(_) => trimmed.to_owned(),
        Err(_) => String::new(),
    }
}

/// Reads one value per descriptor, in descriptor order. Number fields that
/// do not hold a number become `FieldValue::NotANumber`; nothing here
/// blocks the submission.
pub fn collect_values(fields: &[FieldDescriptor], raw: &BTreeMap<String, String>) -> FieldValues {
    let mut values = FieldValues::default();
    for field in fields {
        let entry = raw.get(&field.name).map(String::as_str).unwrap_or("");
        let value = match field.kind {
            FieldKind::Number => match parse_number_input(entry) {
                Some(number) => FieldValue::Number(number),
                None => FieldValue::NotANumber,
            },
            FieldKind::Date => FieldValue::Text(normalize_date_input(entry)),
            FieldKind::Text => FieldValue::Text(entry.to_owned()),
        };
        values.push(&field.name, value);
    }
    values
}

pub fn build_save_payload(
    context: &FillInContext,
    raw: &BTreeMap<String, String>,
) -> SavePayload {
    SavePayload {
        sector: context.sector.clone(),
        indicator: context.indicator.clone(),
        spreadsheet_name: context.spreadsheet_name.clone(),
        sheet_name: context.sheet_name.clone(),
        values: collect_values(&context.fields, raw),
    }
}

pub fn blank_values(fields: &[FieldDescriptor]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|field| (field.name.clone(), String::new()))
        .collect()
}

pub const MISSING_FILE_MESSAGE: &str = "Please select a file to upload.";
pub const BAD_EXTENSION_MESSAGE: &str = "Please select an Excel file (.xlsx or .xls).";

/// Client-side check before an upload. It only spares a round trip; the
/// server repeats the extension check.
pub fn validate_upload(file: Option<&Path>) -> Result<PathBuf, &'static str> {
    let Some(path) = file else {
        return Err(MISSING_FILE_MESSAGE);
    };
    if !is_spreadsheet_name(&file_display_name(path)) {
        return Err(BAD_EXTENSION_MESSAGE);
    }
    Ok(path.to_path_buf())
}
