//! OPC packaging: lay every part out in the zip with its content type and
//! relationships.

use super::template::{self, content_type as ct, rel_type, XML_DECLARATION};
use super::{escape_xml, PptxError, Presentation};
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const APPLICATION: &str = "edgequake-img2pptx";

/// Write every part of `pres` into a fresh zip and return its bytes.
pub(crate) fn write_package(pres: &Presentation) -> Result<Vec<u8>, PptxError> {
    let slide = pres.slide();
    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".into(), content_types_xml(pres)?.into_bytes()),
        ("_rels/.rels".into(), package_rels_xml()?.into_bytes()),
        ("docProps/core.xml".into(), core_props_xml(pres).into_bytes()),
        ("docProps/app.xml".into(), app_props_xml().into_bytes()),
        ("ppt/presentation.xml".into(), presentation_xml(pres)?.into_bytes()),
        (
            "ppt/_rels/presentation.xml.rels".into(),
            presentation_rels_xml()?.into_bytes(),
        ),
        ("ppt/slides/slide1.xml".into(), slide.to_xml()?.into_bytes()),
        ("ppt/slides/_rels/slide1.xml.rels".into(), slide.rels_xml()?.into_bytes()),
        (
            "ppt/slideLayouts/slideLayout1.xml".into(),
            template::SLIDE_LAYOUT_XML.as_bytes().to_vec(),
        ),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".into(),
            template::SLIDE_LAYOUT_RELS.as_bytes().to_vec(),
        ),
        (
            "ppt/slideMasters/slideMaster1.xml".into(),
            template::SLIDE_MASTER_XML.as_bytes().to_vec(),
        ),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".into(),
            template::SLIDE_MASTER_RELS.as_bytes().to_vec(),
        ),
        ("ppt/theme/theme1.xml".into(), template::THEME_XML.as_bytes().to_vec()),
        ("ppt/presProps.xml".into(), template::PRES_PROPS_XML.as_bytes().to_vec()),
        ("ppt/viewProps.xml".into(), template::VIEW_PROPS_XML.as_bytes().to_vec()),
        (
            "ppt/tableStyles.xml".into(),
            template::TABLE_STYLES_XML.as_bytes().to_vec(),
        ),
    ];
    for media in slide.media() {
        parts.push((format!("ppt/media/{}", media.file_name), media.data.clone()));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in &parts {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(data)?;
    }
    let bytes = writer.finish()?.into_inner();

    debug!("Packaged {} parts into {} bytes", parts.len(), bytes.len());
    Ok(bytes)
}

/// `[Content_Types].xml`: defaults by extension, overrides by part name.
fn content_types_xml(pres: &Presentation) -> Result<String, PptxError> {
    let mut defaults: BTreeMap<&str, &str> = BTreeMap::new();
    defaults.insert("rels", ct::RELATIONSHIPS);
    defaults.insert("xml", ct::XML);
    for media in pres.slide().media() {
        defaults.insert(media.extension(), media.content_type);
    }

    let overrides = [
        ("/ppt/presentation.xml", ct::PRESENTATION),
        ("/ppt/slides/slide1.xml", ct::SLIDE),
        ("/ppt/slideLayouts/slideLayout1.xml", ct::SLIDE_LAYOUT),
        ("/ppt/slideMasters/slideMaster1.xml", ct::SLIDE_MASTER),
        ("/ppt/theme/theme1.xml", ct::THEME),
        ("/ppt/presProps.xml", ct::PRES_PROPS),
        ("/ppt/viewProps.xml", ct::VIEW_PROPS),
        ("/ppt/tableStyles.xml", ct::TABLE_STYLES),
        ("/docProps/core.xml", ct::CORE_PROPS),
        ("/docProps/app.xml", ct::APP_PROPS),
    ];

    let mut xml = String::with_capacity(2048);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    for (ext, content_type) in defaults {
        write!(
            xml,
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            escape_xml(ext),
            content_type
        )?;
    }
    for (part, content_type) in overrides {
        write!(xml, r#"<Override PartName="{part}" ContentType="{content_type}"/>"#)?;
    }
    xml.push_str("</Types>");
    Ok(xml)
}

fn relationships_xml(rels: &[(&str, &str, &str)]) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(256 + rels.len() * 160);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for (id, ty, target) in rels {
        write!(xml, r#"<Relationship Id="{id}" Type="{ty}" Target="{target}"/>"#)?;
    }
    xml.push_str("</Relationships>");
    Ok(xml)
}

fn package_rels_xml() -> Result<String, PptxError> {
    relationships_xml(&[
        ("rId1", rel_type::OFFICE_DOCUMENT, "ppt/presentation.xml"),
        ("rId2", rel_type::CORE_PROPS, "docProps/core.xml"),
        ("rId3", rel_type::APP_PROPS, "docProps/app.xml"),
    ])
}

fn presentation_rels_xml() -> Result<String, PptxError> {
    relationships_xml(&[
        ("rId1", rel_type::SLIDE_MASTER, "slideMasters/slideMaster1.xml"),
        ("rId2", rel_type::SLIDE, "slides/slide1.xml"),
        ("rId3", rel_type::THEME, "theme/theme1.xml"),
        ("rId4", rel_type::PRES_PROPS, "presProps.xml"),
        ("rId5", rel_type::VIEW_PROPS, "viewProps.xml"),
        ("rId6", rel_type::TABLE_STYLES, "tableStyles.xml"),
    ])
}

fn presentation_xml(pres: &Presentation) -> Result<String, PptxError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">"#);
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    xml.push_str(r#"<p:sldIdLst><p:sldId id="256" r:id="rId2"/></p:sldIdLst>"#);
    write!(
        xml,
        r#"<p:sldSz cx="{}" cy="{}"/>"#,
        pres.slide_width(),
        pres.slide_height()
    )?;
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    Ok(xml)
}

fn core_props_xml(pres: &Presentation) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(XML_DECLARATION);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);
    if let Some(title) = pres.title() {
        xml.push_str("<dc:title>");
        xml.push_str(&escape_xml(title));
        xml.push_str("</dc:title>");
    }
    xml.push_str("<dc:creator>");
    xml.push_str(APPLICATION);
    xml.push_str("</dc:creator>");
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_props_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{APPLICATION}</Application><Slides>1</Slides></Properties>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::{Frame, Slide};

    #[test]
    fn content_types_include_media_defaults() {
        let mut slide = Slide::new();
        slide.add_picture(Frame::new(0, 0, 1, 1), vec![0], "png", "");
        let pres = Presentation::new(12_192_000, 6_858_000, slide);
        let xml = content_types_xml(&pres).unwrap();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/ppt/slides/slide1.xml""#));
    }

    #[test]
    fn presentation_xml_has_slide_size() {
        let pres = Presentation::new(9_144_000, 6_858_000, Slide::new());
        let xml = presentation_xml(&pres).unwrap();
        assert!(xml.contains(r#"<p:sldSz cx="9144000" cy="6858000"/>"#));
        assert!(xml.contains(r#"<p:sldId id="256" r:id="rId2"/>"#));
    }

    #[test]
    fn core_props_escape_title() {
        let pres = Presentation::new(9_144_000, 6_858_000, Slide::new()).with_title("Q&A");
        assert!(core_props_xml(&pres).contains("<dc:title>Q&amp;A</dc:title>"));
    }
}
