//! Embedding images as media parts and inline drawings.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::{NS_A, NS_PIC, NS_R, NS_WP, REL_IMAGE};
use crate::document::{main_relationships, Document};
use crate::error::{DocxError, Result};
use crate::package::relative_target;
use crate::xml::Element;

/// English Metric Units per point.
pub(crate) const EMU_PER_POINT: f64 = 12700.0;

/// Points per pixel at 96 DPI.
pub(crate) const POINTS_PER_PIXEL: f64 = 0.75;

/// A decoded image header: format and pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageInfo {
    pub extension: &'static str,
    pub content_type: &'static str,
    pub width_px: u32,
    pub height_px: u32,
}

impl ImageInfo {
    pub fn natural_size_pt(&self) -> (f64, f64) {
        (
            self.width_px as f64 * POINTS_PER_PIXEL,
            self.height_px as f64 * POINTS_PER_PIXEL,
        )
    }
}

/// Sniffs the format and reads the dimensions without decoding pixels.
pub(crate) fn inspect_image(bytes: &[u8]) -> Result<ImageInfo> {
    let format = image::guess_format(bytes)
        .map_err(|e| DocxError::Fill(format!("unrecognised image data: {}", e)))?;
    let (extension, content_type) = match format {
        ImageFormat::Png => ("png", "image/png"),
        ImageFormat::Jpeg => ("jpeg", "image/jpeg"),
        ImageFormat::Gif => ("gif", "image/gif"),
        ImageFormat::Bmp => ("bmp", "image/bmp"),
        other => {
            return Err(DocxError::Fill(format!(
                "unsupported image format: {:?}",
                other
            )))
        }
    };
    let (width_px, height_px) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| DocxError::Fill(format!("failed to read image: {}", e)))?;
    Ok(ImageInfo {
        extension,
        content_type,
        width_px,
        height_px,
    })
}

/// An image stored in the package and reachable from the main part.
#[derive(Debug, Clone)]
pub(crate) struct EmbeddedImage {
    pub rel_id: String,
    pub file_name: String,
    pub info: ImageInfo,
}

/// Stores `bytes` as a media part and returns the relationship to it.
///
/// Media part names are derived from a content hash, so the same image is
/// stored once however many cells show it.
pub(crate) fn embed_image(doc: &mut Document, bytes: &[u8]) -> Result<EmbeddedImage> {
    let info = inspect_image(bytes)?;
    let digest = hex::encode(Sha256::digest(bytes));
    let file_name = format!("image_{}.{}", &digest[..16], info.extension);
    let part_name = format!("word/media/{}", file_name);

    let package = doc.package_mut();
    if !package.contains(&part_name) {
        package.set_part(&part_name, bytes.to_vec());
        debug!("Stored media part {} ({} bytes)", part_name, bytes.len());
    }
    package.ensure_default_content_type(info.extension, info.content_type)?;

    let main_part = doc.main_part_name().to_string();
    let target = relative_target(&main_part, &part_name);
    let mut rels = main_relationships(doc)?;
    let rel_id = match rels.find_target(REL_IMAGE, &target) {
        Some(rel) => rel.id.clone(),
        None => {
            let id = rels.add(REL_IMAGE, &target, false);
            doc.package_mut().set_relationships(&main_part, &rels);
            id
        }
    };

    let root = doc.root_mut();
    if root.attr("xmlns:r").is_none() {
        root.set_attr("xmlns:r", NS_R);
    }
    if root.attr("xmlns:wp").is_none() {
        root.set_attr("xmlns:wp", NS_WP);
    }

    Ok(EmbeddedImage {
        rel_id,
        file_name,
        info,
    })
}

/// Builds a `w:drawing` showing `image` inline at `width_pt` x `height_pt`.
pub(crate) fn inline_drawing(
    image: &EmbeddedImage,
    width_pt: f64,
    height_pt: f64,
    id: u32,
) -> Result<Element> {
    let cx = (width_pt * EMU_PER_POINT).round() as u64;
    let cy = (height_pt * EMU_PER_POINT).round() as u64;
    let xml = format!(
        r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{id}" name="Picture {id}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{ns_a}" noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic xmlns:a="{ns_a}"><a:graphicData uri="{ns_pic}"><pic:pic xmlns:pic="{ns_pic}"><pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#,
        cx = cx,
        cy = cy,
        id = id,
        ns_a = NS_A,
        ns_pic = NS_PIC,
        name = image.file_name,
        rel = image.rel_id,
    );
    Element::parse_fragment(&xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{docx_from_body, png_bytes};

    #[test]
    fn test_inspect_png() {
        let info = inspect_image(&png_bytes(40, 20)).unwrap();
        assert_eq!(info.extension, "png");
        assert_eq!((info.width_px, info.height_px), (40, 20));
        assert_eq!(info.natural_size_pt(), (30.0, 15.0));
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        assert!(matches!(inspect_image(b"not an image"), Err(DocxError::Fill(_))));
    }

    #[test]
    fn test_same_image_is_stored_once() {
        let mut doc = Document::from_bytes(&docx_from_body("<w:sectPr/>")).unwrap();
        let png = png_bytes(2, 2);
        let first = embed_image(&mut doc, &png).unwrap();
        let second = embed_image(&mut doc, &png).unwrap();
        assert_eq!(first.rel_id, second.rel_id);
        let media = doc
            .package()
            .part_names()
            .filter(|n| n.starts_with("word/media/"))
            .count();
        assert_eq!(media, 1);
        assert_eq!(main_relationships(&doc).unwrap().len(), 1);
    }

    #[test]
    fn test_inline_drawing_extent() {
        let mut doc = Document::from_bytes(&docx_from_body("<w:sectPr/>")).unwrap();
        let image = embed_image(&mut doc, &png_bytes(4, 4)).unwrap();
        let drawing = inline_drawing(&image, 100.0, 50.0, 7).unwrap();
        let inline = drawing.child("wp:inline").unwrap();
        let extent = inline.child("wp:extent").unwrap();
        assert_eq!(extent.attr("cx"), Some("1270000"));
        assert_eq!(extent.attr("cy"), Some("635000"));
        assert_eq!(inline.child("wp:docPr").and_then(|d| d.attr("id")), Some("7"));
    }
}
