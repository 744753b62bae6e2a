//! Spreadsheet rendering of an accounting report.

use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::models::{Report, TopEntry};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const SUMMARY_SHEET: &str = "Résumé";
const TOP_SHEET: &str = "Top Ventes";
const DETAIL_SHEET: &str = "Détail des Ventes";

const DETAIL_HEADERS: [&str; 10] = [
    "Date",
    "Produit",
    "Client",
    "Canal",
    "Prix",
    "Bénéfice",
    "Commission",
    "URSSAF",
    "Dépenses",
    "Heures",
];

/// Render `report` as an `.xlsx` workbook held in memory.
pub fn render_workbook(report: &Report) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let title = Format::new().set_bold().set_font_size(16);

    write_summary(workbook.add_worksheet(), report, &bold, &title)?;
    write_top_sales(workbook.add_worksheet(), report, &bold)?;
    write_details(workbook.add_worksheet(), report, &bold)?;

    workbook.save_to_buffer()
}

fn write_summary(
    sheet: &mut Worksheet,
    report: &Report,
    bold: &Format,
    title: &Format,
) -> Result<(), XlsxError> {
    sheet.set_name(SUMMARY_SHEET)?;
    sheet.write_string_with_format(0, 0, "Rapport Comptable", title)?;
    sheet.write_string(1, 0, "Période")?;
    sheet.write_string(1, 1, report.range.label())?;

    let summary = &report.summary;
    let totals = [
        ("Total Ventes", summary.sum_price),
        ("Total Bénéfices", summary.sum_benefit),
        ("Total Commissions", summary.sum_commission),
        ("Total URSSAF", summary.sum_ursaf),
        ("Total Dépenses", summary.sum_expense),
        ("Total Heures Travaillées", summary.sum_time),
    ];
    for (offset, (label, value)) in totals.into_iter().enumerate() {
        let row = 3 + offset as u32;
        sheet.write_string_with_format(row, 0, label, bold)?;
        sheet.write_number(row, 1, value)?;
    }

    sheet.set_column_width(0, 25)?;
    sheet.set_column_width(1, 15)?;
    Ok(())
}

fn write_top_sales(sheet: &mut Worksheet, report: &Report, bold: &Format) -> Result<(), XlsxError> {
    sheet.set_name(TOP_SHEET)?;

    let mut row = 0;
    row = write_top_table(
        sheet,
        row,
        bold,
        "Top Produits",
        ["Produit", "Quantité", "Total"],
        &report.top_products,
    )?;
    row = write_top_table(
        sheet,
        row + 2,
        bold,
        "Top Canaux de Vente",
        ["Canal", "Nombre de ventes", "Total"],
        &report.top_channels,
    )?;
    write_top_table(
        sheet,
        row + 2,
        bold,
        "Top Clients",
        ["Client", "Nombre d'achats", "Total"],
        &report.top_clients,
    )?;

    sheet.set_column_width(0, 30)?;
    sheet.set_column_width(1, 15)?;
    sheet.set_column_width(2, 15)?;
    Ok(())
}

/// Write a titled three-column table starting at `row`. Returns the next free row.
fn write_top_table(
    sheet: &mut Worksheet,
    mut row: u32,
    bold: &Format,
    heading: &str,
    headers: [&str; 3],
    entries: &[TopEntry],
) -> Result<u32, XlsxError> {
    sheet.write_string_with_format(row, 0, heading, bold)?;
    row += 1;
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(row, col as u16, *header)?;
    }
    row += 1;
    for entry in entries {
        sheet.write_string(row, 0, &entry.name)?;
        sheet.write_number(row, 1, entry.count as f64)?;
        sheet.write_number(row, 2, entry.total)?;
        row += 1;
    }
    Ok(row)
}

fn write_details(sheet: &mut Worksheet, report: &Report, bold: &Format) -> Result<(), XlsxError> {
    sheet.set_name(DETAIL_SHEET)?;
    for (col, header) in DETAIL_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
    }

    for (idx, sale) in report.sales.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, display_date(&sale.created_at))?;
        sheet.write_string(row, 1, sale.products.join(", "))?;
        sheet.write_string(row, 2, sale.client.as_deref().unwrap_or(""))?;
        sheet.write_string(row, 3, sale.canal.as_deref().unwrap_or("N/A"))?;
        let amounts = [
            sale.price,
            sale.benefit,
            sale.commission,
            sale.ursaf,
            sale.expense,
            sale.time,
        ];
        for (offset, amount) in amounts.into_iter().enumerate() {
            sheet.write_number(row, 4 + offset as u16, amount)?;
        }
    }

    sheet.autofit();
    Ok(())
}

/// `2024-03-05 10:00:00` -> `05/03/2024`; anything unparseable is kept verbatim.
fn display_date(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}
