//! Shared fixtures for the integration tests.
//!
//! Documents are authored with docx-rs so the tests read packages produced
//! by another writer, not just our own output.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use image::{ImageFormat, Rgb, RgbImage};

pub fn cell(text: &str) -> TableCell {
    TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)))
}

pub fn row(texts: &[&str]) -> TableRow {
    TableRow::new(texts.iter().map(|t| cell(t)).collect())
}

pub fn pack(docx: Docx) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).expect("Failed to pack docx");
    buf.into_inner()
}

/// A registration form with label/value pairs and a photo slot.
pub fn form_docx() -> Vec<u8> {
    pack(
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("登记表 ${form_no}")))
            .add_table(Table::new(vec![
                row(&["姓名", "", "照片"]),
                row(&["出生日期", "", ""]),
                row(&["备注", "${note|无}", ""]),
            ])),
    )
}

/// A score sheet with a header row and an empty 2x3 body.
pub fn sheet_docx() -> Vec<u8> {
    pack(Docx::new().add_table(Table::new(vec![
        row(&["科目", "分数", "等级"]),
        row(&["", "", ""]),
        row(&["", "", ""]),
    ])))
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    path
}

pub fn png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([shade, 0, 255 - shade]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("Failed to encode png");
    buf.into_inner()
}
