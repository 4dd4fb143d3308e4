//! Integration test: building documents from fragments

mod common;

use common::*;
use docx_splice::document::fragments::{
    heading, page_break, picture, HeadingLang, Orientation, ParagraphBuilder, PictureOptions,
    TableBuilder, TextStyle,
};
use docx_splice::opc::{ContentTypes, Relationships};
use docx_splice::xml::namespace::W;
use docx_splice::xml::XmlElement;
use docx_splice::{Document, Error, ReplacementPayload};
use pretty_assertions::assert_eq;
use regex::Regex;

#[test]
fn test_build_report() {
    init_logger();
    let mut doc = Document::new();
    let f = doc.factory();
    let parts = vec![
        heading(&f, "Quarterly report", 1, HeadingLang::En).unwrap(),
        ParagraphBuilder::empty()
            .span("Revenue ", TextStyle::parse("b"))
            .span("grew.", TextStyle::default())
            .build(&f)
            .unwrap(),
        TableBuilder::new()
            .row(["Region", "Total"])
            .row(["North", "10"])
            .build(&f)
            .unwrap(),
        page_break(&f, "page", Orientation::Portrait).unwrap(),
    ];
    for part in parts {
        doc.add(part);
    }

    let bytes = doc.to_bytes().unwrap();
    let body = XmlElement::parse(&read_text(&bytes, "word/document.xml")).unwrap();
    let body = body.child(W, "body").unwrap();

    let kinds: Vec<_> = body.children.iter().map(|c| c.name.local.as_str()).collect();
    assert_eq!(kinds, ["p", "p", "tbl", "p"]);

    let reopened_texts = docx_splice::document::matcher::paragraph_texts(body);
    assert_eq!(
        reopened_texts,
        ["Quarterly report", "Revenue grew.", "Region", "Total", "North", "10"]
    );
}

#[test]
fn test_picture_is_packaged() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("chart.png");
    image::RgbImage::new(4, 4).save(&image_path).unwrap();

    let mut doc = Document::new();
    let p = picture(&mut doc, &image_path, "Chart", PictureOptions::default()).unwrap();
    doc.add(p);

    let bytes = doc.to_bytes().unwrap();

    let names = entry_names(&bytes);
    let media = names.iter().position(|n| n == "word/media/chart.png").unwrap();
    assert_eq!(names.last().map(String::as_str), Some("word/document.xml"));
    assert!(media < names.len() - 1);
    assert_eq!(
        read_entry(&bytes, "word/media/chart.png"),
        std::fs::read(&image_path).unwrap()
    );

    let rels = Relationships::from_xml(&read_text(&bytes, "word/_rels/document.xml.rels")).unwrap();
    let image_rel = rels.get("rId7").unwrap();
    assert_eq!(image_rel.target, "media/chart.png");

    let ct_xml = read_text(&bytes, "[Content_Types].xml");
    assert!(ct_xml.contains(r#"Extension="png""#));
    let ct = ContentTypes::from_xml(&ct_xml).unwrap();
    assert_eq!(
        ct.get(&docx_splice::PartUri::new("/word/media/chart.png").unwrap()),
        Some("image/png")
    );
}

#[test]
fn test_same_media_name_is_written_once() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("logo.png");
    image::RgbImage::new(2, 2).save(&image_path).unwrap();

    let mut doc = Document::new();
    for _ in 0..2 {
        let p = picture(&mut doc, &image_path, "Logo", PictureOptions::default()).unwrap();
        doc.add(p);
    }

    let bytes = doc.to_bytes().unwrap();
    let count = entry_names(&bytes)
        .iter()
        .filter(|n| *n == "word/media/logo.png")
        .count();
    assert_eq!(count, 1);
}

#[test]
fn test_media_removed_before_save() {
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("gone.png");
    image::RgbImage::new(2, 2).save(&image_path).unwrap();

    let mut doc = Document::new();
    let p = picture(&mut doc, &image_path, "", PictureOptions::default()).unwrap();
    doc.add(p);
    std::fs::remove_file(&image_path).unwrap();

    let output = dir.path().join("out.docx");
    assert!(matches!(
        doc.save(&output),
        Err(Error::MediaSourceUnreadable { path, .. }) if path == image_path
    ));
}

#[test]
fn test_replace_with_node_payload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.docx");
    write_template(&path, &["See ", "[[chart]]", " below"]);

    let mut doc = Document::open(&path).unwrap();
    let marker = doc.factory().element("w:br").unwrap();
    let payload = ReplacementPayload::Node(marker);

    let count = doc.replace(&Regex::new(r"\[\[chart\]\]").unwrap(), &payload);

    assert_eq!(count, 1);
    assert_eq!(doc.paragraph_texts(), ["See  below"]);
    let breaks = doc.body().descendants().filter(|e| e.is(W, "br")).count();
    assert_eq!(breaks, 1);
}

#[test]
fn test_leaf_replace_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("template.docx");
    write_template(&path, &["total: 10", "total: 20"]);

    let mut doc = Document::open(&path).unwrap();
    let re = Regex::new(r"\d+").unwrap();

    assert_eq!(doc.search(&re).map(|e| e.text()), Some("total: 20"));
    assert_eq!(doc.replace_in_leaves(&re, &"N".into()), 2);
    assert_eq!(doc.paragraph_texts(), ["total: Ntotal: N"]);
}
