use rust_xlsxwriter::{
    utility, Color, Format, FormatAlign, FormatBorder, Formula, Workbook, Worksheet,
};
use serde_json::{Map, Value};

use crate::error::AppError;

const HEADER_FILL: u32 = 0x366092;
const TOTALS_FILL: u32 = 0xE7E6E6;
const DEFAULT_COLUMN_WIDTH: f64 = 15.0;

/// How the totals row is produced, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsPolicy {
    None,
    /// Numeric values are summed per column in memory, excluding columns
    /// whose name ends in "id".
    Calculated,
    /// Live SUM formulas over the data range.
    Formulas,
}

/// Accumulates the layout and formatting of a single-sheet report workbook.
/// Nothing is written until `finish`, which lays out the whole sheet,
/// serializes it and consumes the builder; no handle to the worksheet
/// survives serialization.
pub struct ReportBuilder {
    sheet_name: String,
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
    totals: TotalsPolicy,
    full_formatting: bool,
}

impl ReportBuilder {
    pub fn new(sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            columns: Vec::new(),
            rows: Vec::new(),
            totals: TotalsPolicy::None,
            full_formatting: false,
        }
    }

    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn rows(mut self, rows: Vec<Map<String, Value>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn totals(mut self, policy: TotalsPolicy) -> Self {
        self.totals = policy;
        self
    }

    /// Enables data-row alignment, the totals fill and thin borders over the
    /// whole header-through-totals rectangle. Without it only the header row
    /// is styled.
    pub fn full_formatting(mut self) -> Self {
        self.full_formatting = true;
        self
    }

    pub fn finish(self) -> Result<Vec<u8>, AppError> {
        let mut sheet = Worksheet::new();
        sheet.set_name(&self.sheet_name)?;

        let border = if self.full_formatting {
            FormatBorder::Thin
        } else {
            FormatBorder::None
        };
        let header_format = Format::new()
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_font_color(Color::White)
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(border);
        let data_format = if self.full_formatting {
            Format::new()
                .set_align(FormatAlign::Left)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(border)
        } else {
            Format::new()
        };
        let totals_format = Format::new()
            .set_background_color(Color::RGB(TOTALS_FILL))
            .set_bold()
            .set_border(border);

        // Header row
        for (col, name) in self.columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, name, &header_format)?;
        }

        // Data rows, cells matched to columns by name. Missing columns stay
        // blank, extra row keys are ignored.
        for (row_idx, row) in self.rows.iter().enumerate() {
            let row_num = row_idx as u32 + 1;
            for (col_idx, column) in self.columns.iter().enumerate() {
                match row.get(column) {
                    Some(value) => {
                        write_value(&mut sheet, row_num, col_idx as u16, value, &data_format)?
                    }
                    None => {
                        sheet.write_blank(row_num, col_idx as u16, &data_format)?;
                    }
                }
            }
        }

        match self.totals {
            TotalsPolicy::None => {}
            TotalsPolicy::Calculated => self.write_calculated_totals(&mut sheet, &totals_format)?,
            TotalsPolicy::Formulas => self.write_formula_totals(&mut sheet, &totals_format)?,
        }

        for col in 0..self.columns.len() as u16 {
            sheet.set_column_width(col, DEFAULT_COLUMN_WIDTH)?;
        }

        let mut workbook = Workbook::new();
        workbook.push_worksheet(sheet);
        Ok(workbook.save_to_buffer()?)
    }

    // Totals land immediately below the last data row (row N+2, 1-indexed).
    fn totals_row(&self) -> u32 {
        self.rows.len() as u32 + 1
    }

    fn write_calculated_totals(
        &self,
        sheet: &mut Worksheet,
        format: &Format,
    ) -> Result<(), AppError> {
        let row_num = self.totals_row();

        for (col_idx, column) in self.columns.iter().enumerate() {
            let col_num = col_idx as u16;

            if col_idx == 0 {
                sheet.write_string_with_format(row_num, col_num, "Total", format)?;
                continue;
            }

            // Identifier columns are never summed.
            if column.to_lowercase().ends_with("id") {
                sheet.write_blank(row_num, col_num, format)?;
                continue;
            }

            let mut sum = 0.0;
            let mut numeric = false;
            for row in &self.rows {
                if let Some(value) = row.get(column).and_then(Value::as_f64) {
                    sum += value;
                    numeric = true;
                }
            }

            if numeric {
                sheet.write_number_with_format(row_num, col_num, sum, format)?;
            } else {
                sheet.write_blank(row_num, col_num, format)?;
            }
        }

        Ok(())
    }

    fn write_formula_totals(
        &self,
        sheet: &mut Worksheet,
        format: &Format,
    ) -> Result<(), AppError> {
        let row_num = self.totals_row();
        // 1-indexed spreadsheet rows spanned by the data
        let first_data = 2;
        let last_data = self.rows.len() as u32 + 1;

        for (col_idx, _) in self.columns.iter().enumerate() {
            let col_num = col_idx as u16;

            if col_idx == 0 {
                sheet.write_string_with_format(row_num, col_num, "Total", format)?;
                continue;
            }

            let letter = utility::column_number_to_name(col_num);
            let formula = Formula::new(format!("=SUM({letter}{first_data}:{letter}{last_data})"));
            sheet.write_formula_with_format(row_num, col_num, formula, format)?;
        }

        Ok(())
    }
}

fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    format: &Format,
) -> Result<(), AppError> {
    match value {
        Value::Number(n) => {
            sheet.write_number_with_format(row, col, n.as_f64().unwrap_or(0.0), format)?;
        }
        Value::String(s) => {
            sheet.write_string_with_format(row, col, s, format)?;
        }
        Value::Bool(b) => {
            sheet.write_boolean_with_format(row, col, *b, format)?;
        }
        Value::Null => {
            sheet.write_blank(row, col, format)?;
        }
        other => {
            sheet.write_string_with_format(row, col, &other.to_string(), format)?;
        }
    }

    Ok(())
}
