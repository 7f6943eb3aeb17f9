mod common;

use docxlib_core::{
    copy_doc, fill_image, fill_text, get_cell_text, get_section_count, get_section_table_count,
    is_valid_docx_path, load_docx, load_docx_bytes, merge_docs, save_docx, Document, DocxError,
    FillTarget, ImageOptions, ImageSource, TextStyle,
};
use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::TempDir;

#[fixture]
fn workspace() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

#[fixture]
fn sheet() -> Document {
    load_docx_bytes(&common::sheet_docx()).expect("Failed to load sheet")
}

fn embedded_targets(doc: &Document) -> Vec<String> {
    let mut ids = Vec::new();
    doc.body().walk(&mut |el| {
        if el.name == "a:blip" {
            if let Some(id) = el.attr("r:embed") {
                ids.push(id.to_string());
            }
        }
    });
    let rels = doc
        .package()
        .relationships(doc.main_part_name())
        .expect("Failed to read relationships");
    ids.iter()
        .map(|id| {
            rels.get(id)
                .unwrap_or_else(|| panic!("dangling relationship {}", id))
                .target
                .clone()
        })
        .collect()
}

#[rstest]
fn test_load_rejects_bad_paths(workspace: TempDir) {
    let missing = load_docx(workspace.path().join("nope.docx")).unwrap_err();
    assert!(matches!(missing, DocxError::Document(_)));

    let txt = common::write_file(workspace.path(), "notes.txt", b"hello");
    assert!(matches!(load_docx(&txt), Err(DocxError::Validation(_))));

    let fake = common::write_file(workspace.path(), "fake.docx", b"not a zip");
    assert!(matches!(load_docx(&fake), Err(DocxError::Validation(_))));
    assert!(!is_valid_docx_path(&fake));
}

#[rstest]
fn test_save_creates_parent_directories(workspace: TempDir, sheet: Document) {
    let out = workspace.path().join("a").join("b").join("sheet.docx");
    save_docx(&sheet, &out).unwrap();
    assert!(is_valid_docx_path(&out));
    let reloaded = load_docx(&out).unwrap();
    assert_eq!(get_cell_text(&reloaded, (1, 1, 1, 2).into()).unwrap(), "分数");
}

#[rstest]
fn test_untouched_parts_are_preserved(sheet: Document) {
    let original = sheet.package().clone();
    let reloaded = load_docx_bytes(&sheet.to_bytes().unwrap()).unwrap();
    for name in original.part_names() {
        if name == sheet.main_part_name() {
            continue;
        }
        assert_eq!(
            reloaded.package().part(name),
            original.part(name),
            "part {} changed",
            name
        );
    }
}

#[rstest]
fn test_copy_is_independent(sheet: Document) {
    let mut copy = copy_doc(&sheet);
    fill_text(
        &mut copy,
        &FillTarget::at((1, 1, 2, 1)),
        "物理",
        &TextStyle::default(),
    )
    .unwrap();
    assert_eq!(get_cell_text(&copy, (1, 1, 2, 1).into()).unwrap(), "物理");
    assert_eq!(get_cell_text(&sheet, (1, 1, 2, 1).into()).unwrap(), "");
}

#[rstest]
fn test_merge_appends_sections_and_images() {
    let mut first = load_docx_bytes(&common::form_docx()).unwrap();
    let mut second = load_docx_bytes(&common::form_docx()).unwrap();
    let red = common::png(4, 4, 250);
    let blue = common::png(4, 4, 10);
    for (doc, img) in [(&mut first, &red), (&mut second, &blue)] {
        fill_image(
            doc,
            &FillTarget::below("照片"),
            ImageSource::Bytes(img),
            &ImageOptions::default(),
        )
        .unwrap();
    }
    fill_text(
        &mut second,
        &FillTarget::right_of("姓名"),
        "李四",
        &TextStyle::default(),
    )
    .unwrap();

    let merged = merge_docs(&[first, second]).unwrap();
    assert_eq!(get_section_count(&merged), 2);
    assert_eq!(get_section_table_count(&merged, 1).unwrap(), 1);
    assert_eq!(get_section_table_count(&merged, 2).unwrap(), 1);
    assert_eq!(get_cell_text(&merged, (2, 1, 1, 2).into()).unwrap(), "李四");

    // Each picture must still resolve to its own media part after a save.
    let reloaded = load_docx_bytes(&merged.to_bytes().unwrap()).unwrap();
    let targets = embedded_targets(&reloaded);
    assert_eq!(targets.len(), 2);
    assert_ne!(targets[0], targets[1]);
    for target in &targets {
        let part = format!("word/{}", target);
        assert!(reloaded.package().contains(&part), "missing {}", part);
    }

    let mut doc_pr_ids = Vec::new();
    reloaded.body().walk(&mut |el| {
        if el.name == "wp:docPr" {
            doc_pr_ids.push(el.attr("id").unwrap_or_default().to_string());
        }
    });
    doc_pr_ids.dedup();
    assert_eq!(doc_pr_ids.len(), 2);
}

#[rstest]
fn test_merge_of_nothing_fails() {
    assert!(matches!(merge_docs(&[]), Err(DocxError::Document(_))));
}
