//! Hand-written WordprocessingML fixtures for unit tests.

use crate::package::Package;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const EMPTY_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#;

pub(crate) fn document_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <w:body>{}</w:body></w:document>",
        body
    )
}

/// A package whose main part has the given body content plus any extra parts.
pub(crate) fn docx_with_parts(body: &str, extra: &[(&str, &[u8])]) -> Vec<u8> {
    let mut pkg = Package::default();
    pkg.set_part("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec());
    pkg.set_part("_rels/.rels", PACKAGE_RELS.as_bytes().to_vec());
    pkg.set_part("word/document.xml", document_xml(body).into_bytes());
    pkg.set_part("word/_rels/document.xml.rels", EMPTY_RELS.as_bytes().to_vec());
    for (name, data) in extra {
        pkg.set_part(name, data.to_vec());
    }
    pkg.to_bytes().unwrap()
}

pub(crate) fn docx_from_body(body: &str) -> Vec<u8> {
    docx_with_parts(body, &[])
}

pub(crate) fn paragraph_xml(text: &str) -> String {
    if text.is_empty() {
        return "<w:p/>".to_string();
    }
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", text)
}

pub(crate) fn table_xml(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr/>");
    for row in rows {
        xml.push_str("<w:tr>");
        for text in *row {
            xml.push_str("<w:tc><w:tcPr><w:tcW w:w=\"1000\" w:type=\"dxa\"/></w:tcPr>");
            xml.push_str(&paragraph_xml(text));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

const SECTION_BREAK: &str = "<w:p><w:pPr><w:sectPr/></w:pPr></w:p>";

fn join_sections(sections: Vec<String>) -> String {
    let count = sections.len();
    let mut body = String::new();
    for (i, content) in sections.into_iter().enumerate() {
        body.push_str(&content);
        if i + 1 < count {
            body.push_str(SECTION_BREAK);
        }
    }
    body.push_str("<w:sectPr/>");
    body
}

/// One section per entry, each holding the given paragraphs.
pub(crate) fn docx_with_sections(sections: &[&[&str]]) -> Vec<u8> {
    let sections = sections
        .iter()
        .map(|paras| paras.iter().map(|t| paragraph_xml(t)).collect::<String>())
        .collect();
    docx_from_body(&join_sections(sections))
}

/// One section per entry, each holding the given tables separated by empty paragraphs.
pub(crate) fn docx_with_tables(sections: &[Vec<String>]) -> Vec<u8> {
    let sections = sections
        .iter()
        .map(|tables| tables.iter().map(|t| format!("{}<w:p/>", t)).collect::<String>())
        .collect();
    docx_from_body(&join_sections(sections))
}

/// Smallest valid PNG: `width` x `height` white pixels.
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]));
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
